use agent_schema_core::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const HTTP_WINDOWS: Variant = Variant::new(Transport::Http, OsFamily::Windows);

fn job() -> CommandSpec {
    let list = CommandSpec::define("list")
        .unwrap()
        .with_description("List of jobs")
        .with_example("job list");
    let kill = CommandSpec::define("kill")
        .unwrap()
        .with_description("Kill a specified job")
        .with_argument(ArgumentSpec::string("task_id", true))
        .unwrap();
    let mut job = CommandSpec::define("job")
        .unwrap()
        .with_description("Long-running tasks manager");
    job.add_subcommands([list, kill]).unwrap();
    job
}

fn ps() -> CommandSpec {
    let run = CommandSpec::define("run")
        .unwrap()
        .with_description("Run a program")
        .with_argument(ArgumentSpec::boolean("-s").with_help("Suspend process"))
        .unwrap()
        .with_argument(ArgumentSpec::boolean("-o").with_help("Output to console"))
        .unwrap()
        .with_argument(ArgumentSpec::string("program", true))
        .unwrap()
        .with_argument(ArgumentSpec::string("args", false))
        .unwrap();
    CommandSpec::define("ps")
        .unwrap()
        .with_subcommands([run])
        .unwrap()
}

fn shell() -> CommandSpec {
    let mut shell = CommandSpec::define("shell")
        .unwrap()
        .with_description("Execute command via cmd.exe")
        .with_argument(ArgumentSpec::string("command", true))
        .unwrap();
    shell.set_pre_hook(|ctx| {
        if ctx.arg_count() == 0 {
            return HookOutcome::Message("usage: shell <command>".to_string());
        }
        HookOutcome::Rewrite(
            Invocation::new(["ps", "run"])
                .flag("-o")
                .arg(
                    "program",
                    ArgValue::String("C:\\Windows\\System32\\cmd.exe".to_string()),
                )
                .arg("args", ArgValue::String(format!("/c {}", ctx.trailing_text()))),
        )
    });
    shell
}

fn typed_shell(text: &str) -> Invocation {
    Invocation::new(["shell"]).arg("command", ArgValue::String(text.to_string()))
}

// ---------------------------------------------------------------------------
// Variant selection
// ---------------------------------------------------------------------------

#[test]
fn test_job_scenario_preserves_subcommand_order() {
    let set = CommandSet::build("beacon", vec![job()]).unwrap();
    let registry = CommandRegistry::builder()
        .register(set, [HTTP_WINDOWS])
        .build()
        .unwrap();

    let selected = registry.select_for_variant(&HTTP_WINDOWS);
    let job = selected.find(&["job"]).unwrap();
    assert_eq!(job.subcommand_names(), vec!["list", "kill"]);
    assert!(job.find_subcommand("list").unwrap().arguments.is_empty());

    let kill = job.find_subcommand("kill").unwrap();
    assert_eq!(kill.arguments.len(), 1);
    assert_eq!(kill.arguments[0].name, "task_id");
    assert_eq!(kill.arguments[0].kind, ArgKind::String);
    assert!(kill.arguments[0].required);
}

#[test]
fn test_select_is_idempotent() {
    let set = CommandSet::build("beacon", vec![job(), ps(), shell()]).unwrap();
    let registry = CommandRegistry::builder()
        .register(set, [HTTP_WINDOWS])
        .build()
        .unwrap();

    let first = registry.select_for_variant(&HTTP_WINDOWS);
    let second = registry.select_for_variant(&HTTP_WINDOWS);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn test_unknown_variant_yields_empty_set() {
    let registry = CommandRegistry::builder()
        .register(CommandSet::build("beacon", vec![job()]).unwrap(), [HTTP_WINDOWS])
        .build()
        .unwrap();

    for variant in Variant::all().filter(|v| *v != HTTP_WINDOWS) {
        assert!(registry.select_for_variant(&variant).is_empty());
    }
    assert_eq!(registry.variants().collect::<Vec<_>>(), vec![&HTTP_WINDOWS]);
}

// ---------------------------------------------------------------------------
// Structural invariants
// ---------------------------------------------------------------------------

#[test]
fn test_node_with_both_arguments_and_subcommands_fails() {
    let mut node = CommandSpec::define("profile").unwrap();
    node.add_argument(ArgumentSpec::int("size", true)).unwrap();
    assert_eq!(
        node.add_subcommands([CommandSpec::define("killdate").unwrap()])
            .unwrap_err(),
        SchemaError::MixedNode("profile".to_string())
    );

    // Hand-assembled trees are caught when the set is built.
    let mut forged = CommandSpec::define("profile").unwrap();
    forged.arguments.push(ArgumentSpec::int("size", true));
    forged
        .subcommands
        .push(CommandSpec::define("killdate").unwrap());
    assert_eq!(
        CommandSet::build("beacon", vec![forged]).unwrap_err(),
        SchemaError::MixedNode("profile".to_string())
    );
}

#[test]
fn test_duplicate_siblings_fail_everywhere() {
    assert!(matches!(
        CommandSet::build("beacon", vec![job(), job()]),
        Err(SchemaError::DuplicateCommand { .. })
    ));

    let mut forged = job();
    forged.subcommands.push(CommandSpec::define("list").unwrap());
    assert_eq!(
        CommandSet::build("beacon", vec![forged]).unwrap_err(),
        SchemaError::DuplicateCommand {
            scope: "job".to_string(),
            name: "list".to_string()
        }
    );
}

#[test]
fn test_required_argument_never_has_default() {
    let mut cmd = CommandSpec::define("ls").unwrap();
    let err = cmd
        .add_argument(ArgumentSpec::string("directory", true).with_default("."))
        .unwrap_err();
    assert!(matches!(err, SchemaError::RequiredWithDefault { .. }));

    let mut forged = CommandSpec::define("ls").unwrap();
    forged
        .arguments
        .push(ArgumentSpec::string("directory", true).with_default("."));
    assert!(matches!(
        CommandSet::build("beacon", vec![forged]),
        Err(SchemaError::RequiredWithDefault { .. })
    ));
}

// ---------------------------------------------------------------------------
// Pre-hook rewriting
// ---------------------------------------------------------------------------

#[test]
fn test_shell_alias_fails_when_target_unregistered() {
    let set = CommandSet::build("beacon", vec![job(), shell()]).unwrap();
    let err = set
        .dispatch("a1b2c3d4", "shell whoami /all", typed_shell("whoami /all"))
        .unwrap_err();
    assert_eq!(err, DispatchError::UnknownRewriteTarget("ps run".to_string()));
}

#[test]
fn test_shell_alias_rewrites_when_target_registered() {
    let set = CommandSet::build("beacon", vec![ps(), shell()]).unwrap();
    let outcome = set
        .dispatch("a1b2c3d4", "shell whoami /all", typed_shell("whoami /all"))
        .unwrap();

    let DispatchOutcome::Rewritten { original, target } = outcome else {
        panic!("expected a rewrite");
    };
    assert_eq!(original.path, vec!["shell"]);
    assert_eq!(target.path, vec!["ps", "run"]);

    let names: Vec<&str> = target.args.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["-o", "program", "args"]);
    assert_eq!(
        target.get("program"),
        Some(&ArgValue::String("C:\\Windows\\System32\\cmd.exe".to_string()))
    );
    assert_eq!(
        target.get("args"),
        Some(&ArgValue::String("/c whoami /all".to_string()))
    );
    assert_eq!(
        target.to_string(),
        "ps run -o C:\\Windows\\System32\\cmd.exe \"/c whoami /all\""
    );
}

#[test]
fn test_shell_alias_without_payload_prints_usage() {
    let set = CommandSet::build("beacon", vec![ps(), shell()]).unwrap();
    let outcome = set
        .dispatch("a1b2c3d4", "shell", Invocation::new(["shell"]))
        .unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Message("usage: shell <command>".to_string())
    );
}

#[test]
fn test_rewrite_does_not_chain_into_target_hook() {
    let mut echo = CommandSpec::define("echo")
        .unwrap()
        .with_argument(ArgumentSpec::string("text", true))
        .unwrap();
    echo.set_pre_hook(|_| HookOutcome::Message("echo hook ran".to_string()));
    let alias = CommandSpec::define("say")
        .unwrap()
        .with_pre_hook(|ctx| {
            HookOutcome::Rewrite(
                Invocation::new(["echo"]).arg("text", ArgValue::String(ctx.trailing_text().into())),
            )
        });

    let set = CommandSet::build("beacon", vec![echo, alias]).unwrap();
    let outcome = set.dispatch("id", "say hi", Invocation::new(["say"])).unwrap();
    assert!(matches!(outcome, DispatchOutcome::Rewritten { .. }));
}
