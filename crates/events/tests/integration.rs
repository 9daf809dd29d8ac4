//! Integration tests for events

#[cfg(test)]
mod tests {
    use keg_errors::{Error, IntegrityError};
    use keg_events::*;
    use keg_types::Stage;

    #[tokio::test]
    async fn test_emitter_on_sender() {
        let (tx, mut rx) = channel();

        tx.emit_warning("source is unpinned");
        tx.emit_stage_started(Stage::Verify, "blisp");

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first,
            AppEvent::General(GeneralEvent::Warning { .. })
        ));

        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second,
            AppEvent::Stage(StageEvent::Started {
                stage: Stage::Verify,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_debug("ignored");
    }

    #[test]
    fn test_none_sender_is_silent() {
        let sender: Option<EventSender> = None;
        sender.emit_debug("nobody listens");
    }

    #[test]
    fn test_failure_context_from_error() {
        let err: Error = IntegrityError::Mismatch {
            source_name: "prod.tar.gz".into(),
            algorithm: "sha256".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        }
        .into();
        let ctx = FailureContext::from_error(&err);
        assert_eq!(ctx.code.as_deref(), Some("integrity.mismatch"));
        assert!(!ctx.retryable);
        assert!(ctx.hint.is_some());

        let json = serde_json::to_value(AppEvent::Stage(StageEvent::Failed {
            stage: Stage::Verify,
            package: "blisp".into(),
            failure: ctx,
        }))
        .unwrap();
        assert_eq!(json["domain"], "stage");
        assert_eq!(json["event"]["type"], "Failed");
        assert_eq!(json["event"]["stage"], "verify");
    }
}
