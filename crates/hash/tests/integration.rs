//! Integration tests for hash crate

#[cfg(test)]
mod tests {
    use keg_hash::*;
    use keg_types::ExpectedDigest;
    use tempfile::tempdir;
    use tokio::fs;

    #[tokio::test]
    async fn test_file_digest_against_formula_literal() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("blisp-0-1-0.tar.gz");

        let data = b"verify this content";
        fs::write(&file_path, data).await.unwrap();
        let actual = Hash::hash_file(DigestAlgorithm::Sha256, &file_path)
            .await
            .unwrap();

        // Formula literals may be uppercase
        let literal = Hash::from_data(DigestAlgorithm::Sha256, data)
            .to_hex()
            .to_uppercase();
        let expected = ExpectedDigest::parse(DigestAlgorithm::Sha256, &literal).unwrap();
        assert!(actual.matches(&expected));

        let wrong = Hash::from_data(DigestAlgorithm::Sha256, b"different content");
        let wrong = ExpectedDigest::parse(DigestAlgorithm::Sha256, &wrong.to_hex()).unwrap();
        assert!(!actual.matches(&wrong));

        // Same bytes under another algorithm never match
        let blake = ExpectedDigest::from_bytes(DigestAlgorithm::Blake3, *actual.as_bytes());
        assert!(!actual.matches(&blake));
    }

    #[tokio::test]
    async fn test_tree_hash_is_stable() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.go"), "package main").await.unwrap();
        fs::create_dir_all(dir.path().join("lib")).await.unwrap();
        fs::write(dir.path().join("lib/funcs.go"), "package lib")
            .await
            .unwrap();

        let first = hash_tree(DigestAlgorithm::Sha256, dir.path()).await.unwrap();
        let second = hash_tree(DigestAlgorithm::Sha256, dir.path()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.algorithm(), DigestAlgorithm::Sha256);
    }
}
