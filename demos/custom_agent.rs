//! Defining an agent's command sets from scratch.
//!
//! Builds a small Windows/Linux agent with a `shell` alias that rewrites
//! into `exec`, registers one group per OS, and routes a few invocations.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p agent-schema-demos --example custom_agent
//! ```

use agent_schema_core::*;

fn commands(interpreter: &'static str) -> Result<Vec<CommandSpec>, SchemaError> {
    let exec = CommandSpec::define("exec")?
        .with_description("Start a process")
        .with_example("exec -w /usr/bin/id")
        .with_argument(ArgumentSpec::boolean("-w").with_help("Wait for exit"))?
        .with_argument(ArgumentSpec::string("program", true))?
        .with_argument(ArgumentSpec::string("args", false))?;

    let shell = CommandSpec::define("shell")?
        .with_description("Run text through the system shell")
        .with_argument(ArgumentSpec::string("text", true))?
        .with_pre_hook(move |ctx| {
            let text = ctx.trailing_text();
            if text.is_empty() {
                return HookOutcome::Message("usage: shell <text>".to_string());
            }
            HookOutcome::Rewrite(
                Invocation::new(["exec"])
                    .flag("-w")
                    .arg("program", ArgValue::String(interpreter.to_string()))
                    .arg("args", ArgValue::String(text.to_string())),
            )
        });

    let sleep = CommandSpec::define("sleep")?
        .with_description("Set the callback interval")
        .with_argument(ArgumentSpec::int("seconds", false).with_default("60"))?;

    Ok(vec![exec, shell, sleep])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let windows = Variant::new(Transport::Http, OsFamily::Windows);
    let linux = Variant::new(Transport::Http, OsFamily::Linux);

    let registry = CommandRegistry::builder()
        .register(CommandSet::build("demo", commands("cmd.exe")?)?, [windows])
        .register(CommandSet::build("demo", commands("/bin/sh")?)?, [linux])
        .build()?;

    println!("=== Variants ===");
    for variant in registry.variants() {
        println!("  {variant}");
    }

    let set = registry.select_for_variant(&linux);
    print!("{}", render_overview(&set, &HelpStyle::default()));
    print!("{}", render_command(&set, &["sleep"], &HelpStyle::default())?);

    println!();
    println!("=== Dispatch ===");
    let typed = Invocation::new(["shell"]).arg("text", ArgValue::String("uname -a".into()));
    match set.dispatch("demo-1", "shell uname -a", typed)? {
        DispatchOutcome::Rewritten { original, target } => {
            println!("  {original}  =>  {target}");
        }
        other => println!("  {other:?}"),
    }

    let typed = Invocation::new(["sleep"]).arg("seconds", ArgValue::Int(30));
    println!("  {:?}", set.dispatch("demo-1", "sleep 30", typed)?);

    let unknown = registry.select_for_variant(&Variant::new(Transport::Smb, OsFamily::Macos));
    println!("  smb/macos has {} command(s)", unknown.len());

    Ok(())
}
