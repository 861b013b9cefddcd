use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    arguments::{parse_autocomplete_options, resolve_arguments},
    command::CommandDefinition,
    context::{ClientContext, CommandContext, InteractionResponder},
    error::{HandlerError, HookStage},
    interaction::{Interaction, InteractionKind, InteractionOption},
    registry::CommandRegistry,
    types::CommandKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not an application command, or its id is unknown.
    Ignored,
    Executed,
    Autocompleted,
    /// The pipeline failed; the error hooks have already run.
    Failed(String),
}

/// Routes inbound interactions to registered commands.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    client: Arc<dyn ClientContext>,
    responder: Arc<dyn InteractionResponder>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        client: Arc<dyn ClientContext>,
        responder: Arc<dyn InteractionResponder>,
    ) -> Self {
        Self {
            registry,
            client,
            responder,
        }
    }

    /// Consumes interactions until the channel closes or `cancel` fires. Each interaction runs
    /// on its own task.
    pub async fn run(
        self: Arc<Self>,
        mut interaction_rx: mpsc::Receiver<Interaction>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("dispatcher cancelled");
                    break;
                }
                maybe_interaction = interaction_rx.recv() => {
                    let Some(interaction) = maybe_interaction else {
                        break;
                    };
                    let dispatcher = self.clone();
                    tokio::spawn(async move {
                        let id = interaction.id.clone();
                        let outcome = dispatcher.dispatch(interaction).await;
                        debug!(interaction = %id, outcome = ?outcome, "interaction handled");
                    });
                }
            }
        }
    }

    pub async fn dispatch(&self, interaction: Interaction) -> DispatchOutcome {
        if !matches!(
            interaction.kind,
            InteractionKind::ApplicationCommand | InteractionKind::Autocomplete
        ) {
            debug!(interaction = %interaction.id, kind = ?interaction.kind, "ignoring non-command interaction");
            return DispatchOutcome::Ignored;
        }

        let Some(root) = self.registry.lookup(interaction.command_id()) else {
            debug!(
                interaction = %interaction.id,
                command_id = %interaction.command_id(),
                "no command registered under id"
            );
            return DispatchOutcome::Ignored;
        };

        let interaction = Arc::new(interaction);
        let (command, options) = match root.kind() {
            CommandKind::Slash => descend(root, interaction.options()),
            _ => (root, interaction.options()),
        };

        let mut ctx = CommandContext::new(
            self.client.clone(),
            self.responder.clone(),
            interaction.clone(),
            command.clone(),
        );

        let result = if interaction.is_autocomplete() {
            self.autocomplete(&ctx, options)
                .await
                .map(|()| DispatchOutcome::Autocompleted)
        } else {
            self.execute(&mut ctx, options)
                .await
                .map(|()| DispatchOutcome::Executed)
        };

        match result {
            Ok(outcome) => outcome,
            Err(error) => {
                self.client.command_error(&interaction, &error).await;
                command.handler().error(&ctx, &error).await;
                DispatchOutcome::Failed(error.to_string())
            }
        }
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext,
        options: &[InteractionOption],
    ) -> Result<(), HandlerError> {
        let handler = ctx.command().handler().clone();
        let name = ctx.command().qualified_name();

        let passed = handler
            .pre_check(ctx)
            .await
            .map_err(|error| hook_failure(&name, HookStage::PreCheck, error))?;
        if !passed {
            return Err(HandlerError::PreCheckFailed { command: name });
        }

        let arguments = resolve_arguments(ctx.command(), ctx.interaction(), options)?;
        ctx.bind(arguments);

        let passed = handler
            .check(ctx)
            .await
            .map_err(|error| hook_failure(&name, HookStage::Check, error))?;
        if !passed {
            return Err(HandlerError::CheckFailed { command: name });
        }

        handler
            .callback(ctx)
            .await
            .map_err(|error| hook_failure(&name, HookStage::Callback, error))
    }

    async fn autocomplete(
        &self,
        ctx: &CommandContext,
        options: &[InteractionOption],
    ) -> Result<(), HandlerError> {
        let name = ctx.command().qualified_name();
        let (partial, focused) = parse_autocomplete_options(ctx.command(), options);

        let choices = ctx
            .command()
            .handler()
            .autocomplete(ctx, &partial, focused.as_deref())
            .await
            .map_err(|error| hook_failure(&name, HookStage::Autocomplete, error))?;

        self.responder
            .send_autocomplete_choices(ctx.interaction(), &choices)
            .await
            .map_err(|error| HandlerError::Respond {
                command: name,
                error,
            })
    }
}

fn hook_failure(command: &str, stage: HookStage, error: anyhow::Error) -> HandlerError {
    HandlerError::Hook {
        command: command.to_string(),
        stage,
        error,
    }
}

/// Walks subcommand path segments down the command tree. A segment is followed only when it
/// names a declared child; the remaining list is the leaf command's options.
fn descend(
    mut command: Arc<CommandDefinition>,
    mut options: &[InteractionOption],
) -> (Arc<CommandDefinition>, &[InteractionOption]) {
    loop {
        let Some(first) = options.first() else {
            break;
        };
        if !(first.kind.is_subcommand_segment() || first.options.is_some()) {
            break;
        }
        let Some(child) = command.child(&first.name).cloned() else {
            break;
        };

        options = first.options.as_deref().unwrap_or_default();
        command = child;
    }

    (command, options)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::{DispatchOutcome, Dispatcher};
    use crate::{
        arguments::PartialOptions,
        command::CommandBuilder,
        context::{ClientContext, CommandContext, InteractionResponder},
        error::HandlerError,
        hooks::CommandHandler,
        interaction::Interaction,
        option::OptionSpec,
        registry::CommandRegistry,
        schema::OptionChoice,
        types::{CommandId, Scope},
    };

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, event: impl Into<String>) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event.into());
            }
        }

        fn events(&self) -> Vec<String> {
            self.events
                .lock()
                .map(|events| events.clone())
                .unwrap_or_default()
        }
    }

    struct RecordingClient(Arc<Recorder>);

    #[async_trait]
    impl ClientContext for RecordingClient {
        async fn command_error(&self, _interaction: &Interaction, error: &HandlerError) {
            self.0.push(format!("client_error:{error}"));
        }
    }

    struct RecordingResponder(Arc<Recorder>);

    #[async_trait]
    impl InteractionResponder for RecordingResponder {
        async fn send_autocomplete_choices(
            &self,
            _interaction: &Interaction,
            choices: &[OptionChoice],
        ) -> Result<()> {
            let names: Vec<&str> = choices.iter().map(|choice| choice.name.as_str()).collect();
            self.0.push(format!("choices:{}", names.join(",")));
            Ok(())
        }

        async fn send_message(&self, _interaction: &Interaction, content: &str) -> Result<()> {
            self.0.push(format!("message:{content}"));
            Ok(())
        }
    }

    struct SilentResponder;

    #[async_trait]
    impl InteractionResponder for SilentResponder {
        async fn send_autocomplete_choices(
            &self,
            _interaction: &Interaction,
            _choices: &[OptionChoice],
        ) -> Result<()> {
            Err(anyhow!("interaction token expired"))
        }

        async fn send_message(&self, _interaction: &Interaction, _content: &str) -> Result<()> {
            Err(anyhow!("interaction token expired"))
        }
    }

    struct Staged {
        recorder: Arc<Recorder>,
        pass_pre_check: bool,
        pass_check: bool,
        fail_callback: bool,
        fail_autocomplete: bool,
    }

    #[async_trait]
    impl CommandHandler for Staged {
        async fn pre_check(&self, ctx: &CommandContext) -> Result<bool> {
            self.recorder
                .push(format!("pre_check:{}", ctx.arguments().len()));
            Ok(self.pass_pre_check)
        }

        async fn check(&self, _ctx: &CommandContext) -> Result<bool> {
            self.recorder.push("check");
            Ok(self.pass_check)
        }

        async fn callback(&self, ctx: &CommandContext) -> Result<()> {
            if self.fail_callback {
                return Err(anyhow!("boom"));
            }
            let key = ctx.arguments().str("key").unwrap_or("-");
            self.recorder
                .push(format!("callback:{}:{key}", ctx.command().qualified_name()));
            ctx.reply("done").await
        }

        async fn autocomplete(
            &self,
            _ctx: &CommandContext,
            options: &PartialOptions,
            focused: Option<&str>,
        ) -> Result<Vec<OptionChoice>> {
            if self.fail_autocomplete {
                return Err(anyhow!("no suggestions"));
            }
            self.recorder.push(format!(
                "autocomplete:{}:{}",
                focused.unwrap_or("-"),
                options.get("qty").cloned().unwrap_or(Value::Null)
            ));
            Ok(vec![OptionChoice::new("12", "12"), OptionChoice::new("120", "120")])
        }

        async fn error(&self, _ctx: &CommandContext, failure: &HandlerError) {
            self.recorder.push(format!("command_error:{failure}"));
        }
    }

    fn staged(recorder: &Arc<Recorder>, pass_pre_check: bool, fail_callback: bool) -> Staged {
        Staged {
            recorder: recorder.clone(),
            pass_pre_check,
            pass_check: true,
            fail_callback,
            fail_autocomplete: false,
        }
    }

    fn dispatcher(
        recorder: &Arc<Recorder>,
        builder: CommandBuilder,
        id: &str,
    ) -> Dispatcher {
        dispatcher_with(
            recorder,
            builder,
            id,
            Arc::new(RecordingResponder(recorder.clone())),
        )
    }

    fn dispatcher_with(
        recorder: &Arc<Recorder>,
        builder: CommandBuilder,
        id: &str,
        responder: Arc<dyn InteractionResponder>,
    ) -> Dispatcher {
        let registry = Arc::new(CommandRegistry::new());
        let command = match builder.build() {
            Ok(value) => value,
            Err(error) => panic!("build failed: {error}"),
        };
        if let Err(error) = registry.add_command(command.clone()) {
            panic!("registration failed: {error}");
        }
        registry.publish(&Scope::Global, &[(CommandId::from(id), command)]);

        Dispatcher::new(registry, Arc::new(RecordingClient(recorder.clone())), responder)
    }

    fn interaction(raw: Value) -> Interaction {
        match serde_json::from_value(raw) {
            Ok(value) => value,
            Err(error) => panic!("invalid interaction fixture: {error}"),
        }
    }

    #[tokio::test]
    async fn nested_invocation_reaches_leaf_handler() {
        let recorder = Arc::new(Recorder::default());
        let builder = CommandBuilder::slash("config").child(
            CommandBuilder::slash("set")
                .option(OptionSpec::string("key"))
                .handler(staged(&recorder, true, false)),
        );
        let dispatcher = dispatcher(&recorder, builder, "111");

        let outcome = dispatcher
            .dispatch(interaction(json!({
                "id": "1",
                "type": 2,
                "data": {"id": "111", "name": "config", "options": [{
                    "name": "set", "type": 1,
                    "options": [{"name": "key", "type": 3, "value": "motd"}]
                }]}
            })))
            .await;

        assert_eq!(outcome, DispatchOutcome::Executed);
        assert_eq!(
            recorder.events(),
            vec![
                "pre_check:0".to_string(),
                "check".to_string(),
                "callback:config set:motd".to_string(),
                "message:done".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_id_is_ignored() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher(&recorder, CommandBuilder::slash("ping"), "111");

        let outcome = dispatcher
            .dispatch(interaction(json!({"id": "1", "type": 2, "data": {"id": "999", "name": "x"}})))
            .await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn component_interactions_are_ignored() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = dispatcher(&recorder, CommandBuilder::slash("ping"), "111");

        let outcome = dispatcher
            .dispatch(interaction(json!({"id": "1", "type": 3, "data": {"id": "111"}})))
            .await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
    }

    #[tokio::test]
    async fn failed_pre_check_stops_before_arguments() {
        let recorder = Arc::new(Recorder::default());
        let builder = CommandBuilder::slash("ping").handler(staged(&recorder, false, false));
        let dispatcher = dispatcher(&recorder, builder, "111");

        let outcome = dispatcher
            .dispatch(interaction(json!({"id": "1", "type": 2, "data": {"id": "111", "name": "ping"}})))
            .await;

        assert!(matches!(outcome, DispatchOutcome::Failed(_)));
        let events = recorder.events();
        assert_eq!(events[0], "pre_check:0");
        assert!(events[1].starts_with("client_error:the pre-check for ping failed"));
        assert!(events[2].starts_with("command_error:the pre-check for ping failed"));
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn callback_error_reaches_both_error_hooks() {
        let recorder = Arc::new(Recorder::default());
        let builder = CommandBuilder::slash("ping").handler(staged(&recorder, true, true));
        let dispatcher = dispatcher(&recorder, builder, "111");

        let outcome = dispatcher
            .dispatch(interaction(json!({"id": "1", "type": 2, "data": {"id": "111", "name": "ping"}})))
            .await;

        assert!(matches!(outcome, DispatchOutcome::Failed(message) if message.contains("boom")));
        let events = recorder.events();
        assert!(events.iter().any(|event| event.starts_with("client_error:") && event.contains("boom")));
        assert!(events.iter().any(|event| event.starts_with("command_error:") && event.contains("boom")));
    }

    #[tokio::test]
    async fn autocomplete_sends_choices_without_callback() {
        let recorder = Arc::new(Recorder::default());
        let builder = CommandBuilder::slash("order")
            .option(OptionSpec::string("item"))
            .option(OptionSpec::string("qty").autocomplete())
            .handler(staged(&recorder, true, false));
        let dispatcher = dispatcher(&recorder, builder, "111");

        let outcome = dispatcher
            .dispatch(interaction(json!({
                "id": "1",
                "type": 4,
                "data": {"id": "111", "name": "order", "options": [
                    {"name": "qty", "type": 3, "value": "12", "focused": true}
                ]}
            })))
            .await;

        assert_eq!(outcome, DispatchOutcome::Autocompleted);
        assert_eq!(
            recorder.events(),
            vec!["autocomplete:qty:\"12\"".to_string(), "choices:12,120".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_check_stops_before_callback() {
        let recorder = Arc::new(Recorder::default());
        let builder = CommandBuilder::slash("ping").handler(Staged {
            pass_check: false,
            ..staged(&recorder, true, false)
        });
        let dispatcher = dispatcher(&recorder, builder, "111");

        let outcome = dispatcher
            .dispatch(interaction(json!({"id": "1", "type": 2, "data": {"id": "111", "name": "ping"}})))
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed("the check for ping failed".to_string())
        );
        assert_eq!(
            recorder.events(),
            vec![
                "pre_check:0".to_string(),
                "check".to_string(),
                "client_error:the check for ping failed".to_string(),
                "command_error:the check for ping failed".to_string(),
            ]
        );
    }

    fn autocomplete_request() -> Interaction {
        interaction(json!({
            "id": "1",
            "type": 4,
            "data": {"id": "111", "name": "order", "options": [
                {"name": "qty", "type": 3, "value": "1", "focused": true}
            ]}
        }))
    }

    #[tokio::test]
    async fn autocomplete_hook_error_is_reported_once() {
        let recorder = Arc::new(Recorder::default());
        let builder = CommandBuilder::slash("order")
            .option(OptionSpec::string("qty").autocomplete())
            .handler(Staged {
                fail_autocomplete: true,
                ..staged(&recorder, true, false)
            });
        let dispatcher = dispatcher(&recorder, builder, "111");

        let outcome = dispatcher.dispatch(autocomplete_request()).await;

        assert!(matches!(&outcome, DispatchOutcome::Failed(message) if message.contains("no suggestions")));
        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert!(events[0].starts_with("client_error:autocomplete hook of order failed"));
        assert!(events[1].starts_with("command_error:autocomplete hook of order failed"));
    }

    #[tokio::test]
    async fn undeliverable_choices_are_reported_once() {
        let recorder = Arc::new(Recorder::default());
        let builder = CommandBuilder::slash("order")
            .option(OptionSpec::string("qty").autocomplete())
            .handler(staged(&recorder, true, false));
        let dispatcher = dispatcher_with(&recorder, builder, "111", Arc::new(SilentResponder));

        let outcome = dispatcher.dispatch(autocomplete_request()).await;

        assert!(matches!(&outcome, DispatchOutcome::Failed(message) if message.contains("token expired")));
        let events = recorder.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], "autocomplete:qty:\"1\"");
        assert_eq!(
            events
                .iter()
                .filter(|event| event.starts_with("client_error:failed to send autocomplete choices"))
                .count(),
            1
        );
        assert_eq!(
            events
                .iter()
                .filter(|event| event.starts_with("command_error:failed to send autocomplete choices"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn run_loop_stops_on_cancel() {
        let recorder = Arc::new(Recorder::default());
        let builder = CommandBuilder::slash("ping").handler(staged(&recorder, true, false));
        let dispatcher = Arc::new(dispatcher(&recorder, builder, "111"));

        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let cancel = tokio_util::sync::CancellationToken::new();
        let task = tokio::spawn(dispatcher.run(rx, cancel.clone()));

        let sent = tx
            .send(interaction(json!({"id": "1", "type": 2, "data": {"id": "111", "name": "ping"}})))
            .await;
        assert!(sent.is_ok());

        for _ in 0..50 {
            if recorder.events().iter().any(|event| event == "message:done") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(recorder.events().iter().any(|event| event == "message:done"));

        cancel.cancel();
        assert!(task.await.is_ok());
    }
}
