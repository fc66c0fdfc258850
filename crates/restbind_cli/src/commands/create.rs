//! Create command implementation.

use super::with_status;
use crate::console::ConsoleEngine;
use crate::error::CliResult;
use restbind_engine::Transport;

/// Runs the create command: starts a new item, applies the assignments and
/// saves it.
pub async fn run<T: Transport>(
    engine: &ConsoleEngine<T>,
    assignments: &[String],
) -> CliResult<String> {
    engine.create_new()?;
    {
        let mut form = engine.editing();
        for assignment in assignments {
            form.assign(assignment)?;
        }
    }
    engine.save().await?;
    let form = engine.editing().render();
    Ok(with_status(engine, form))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::engine;
    use crate::error::CliError;
    use restbind_engine::{Method, MockTransport};
    use serde_json::json;

    #[tokio::test]
    async fn posts_new_item() {
        let transport = MockTransport::new();
        transport.push_json(201, json!({"id": "42", "name": "Foo", "active": true}));
        transport.push_json(200, json!([]));
        let engine = engine(transport);

        let out = run(&engine, &["name=Foo".into(), "active=on".into()]).await.unwrap();

        let request = &engine.transport().requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "/api/widgets");
        let body: serde_json::Value =
            serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Foo", "active": true}));
        assert_eq!(out, "id: 42\nname: Foo\nactive: [x]\nSaved Foo\n");
    }

    #[tokio::test]
    async fn bad_assignment_sends_nothing() {
        let engine = engine(MockTransport::new());

        let err = run(&engine, &["colour=red".into()]).await.unwrap_err();

        assert!(matches!(err, CliError::UnknownControl(_)));
        assert_eq!(engine.transport().request_count(), 0);
    }
}
