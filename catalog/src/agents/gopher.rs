//! The gopher agent: cross-platform implants on TCP listeners.
//!
//! Windows sessions and Unix sessions (Linux, macOS) get separate command
//! groups that differ in examples and shell wording only.

use agent_schema_core::{
    ArgumentSpec as Arg, CommandRegistry, CommandSpec, OsFamily, SchemaError, Transport, Variant,
};
use agent_schema_forms::{FieldOptions, FieldValue, FormBuilder, FormRegistry, FormSchema, Mutation};
use tracing::info;

use super::{AgentBundle, group, leaf, node};
use crate::config::CatalogConfig;
use crate::error::Result;

pub const NAME: &str = "gopher";

pub const WINDOWS: Variant = Variant::new(Transport::Tcp, OsFamily::Windows);
pub const LINUX: Variant = Variant::new(Transport::Tcp, OsFamily::Linux);
pub const MACOS: Variant = Variant::new(Transport::Tcp, OsFamily::Macos);

pub fn build(config: &CatalogConfig) -> Result<AgentBundle> {
    let windows = group(NAME, commands(true)?, &[], config)?;
    let unix = group(NAME, commands(false)?, &[], config)?;

    let commands = CommandRegistry::builder()
        .register(windows, [WINDOWS])
        .register(unix, [LINUX, MACOS])
        .build()?;
    let forms = FormRegistry::from_schemas([form(WINDOWS)?, form(LINUX)?, form(MACOS)?])?;

    info!(agent = NAME, variants = commands.len(), "built agent");
    Ok(AgentBundle {
        name: NAME.to_string(),
        commands,
        forms,
    })
}

/// Picks the Windows or Unix flavor of an example or description.
fn os<'a>(windows: bool, win: &'a str, unix: &'a str) -> &'a str {
    if windows { win } else { unix }
}

fn commands(windows: bool) -> std::result::Result<Vec<CommandSpec>, SchemaError> {
    let shell = os(windows, "cmd.exe", "/bin/sh");

    Ok(vec![
        leaf("cat", "Read a file", os(windows, "cat C:\\file.exe", "cat /etc/passwd"), vec![
            Arg::string("path", true),
        ])?,
        leaf("cp", "Copy file or directory", "cp src.txt dst.txt", vec![
            Arg::string("src", true),
            Arg::string("dst", true),
        ])?,
        leaf("cd", "Change current working directory", os(windows, "cd C:\\Windows", "cd /home/user"), vec![
            Arg::string("path", true),
        ])?,
        leaf(
            "download",
            "Download a file",
            os(windows, "download C:\\Temp\\file.txt", "download /tmp/file"),
            vec![Arg::string("path", true)],
        )?,
        leaf("exit", "Kill agent", "exit", vec![])?,
        node("job", "Long-running tasks manager", vec![
            leaf("list", "List of jobs", "job list", vec![])?,
            leaf("kill", "Kill a specified job", "job kill 1a2b3c4d", vec![
                Arg::string("task_id", true),
            ])?,
        ])?,
        leaf("kill", "Kill a process with a given PID", "kill 7865", vec![Arg::int("pid", true)])?,
        leaf("ls", "Lists files in a folder", os(windows, "ls C:\\Windows", "ls /home/"), vec![
            Arg::string("path", false).with_default("."),
        ])?,
        leaf("mv", "Move file or directory", "mv src.txt dst.txt", vec![
            Arg::string("src", true),
            Arg::string("dst", true),
        ])?,
        leaf("mkdir", "Make a directory", os(windows, "mkdir C:\\Temp", "mkdir /tmp/ex"), vec![
            Arg::string("path", true),
        ])?,
        leaf("ps", "Show process list", "ps", vec![])?,
        leaf("pwd", "Print current working directory", "pwd", vec![])?,
        leaf("rm", "Remove a file or folder", os(windows, "rm C:\\Temp\\file.txt", "rm /tmp/file"), vec![
            Arg::string("path", true),
        ])?,
        leaf(
            "run",
            &format!("Execute long command or scripts via {shell}"),
            os(windows, "run whoami /all", "run /tmp/script.sh"),
            vec![Arg::string("cmd", true)],
        )?,
        leaf("screenshot", "Take a single screenshot", "screenshot", vec![])?,
        node("socks", "Managing socks tunnels", vec![
            leaf(
                "start",
                "Start a SOCKS5 proxy server and listen on a specified port",
                "socks start 1080 -a user pass",
                vec![
                    Arg::flag_string("-h", "address")
                        .with_default("0.0.0.0")
                        .with_help("Listening interface address"),
                    Arg::int("port", true).with_help("Listen port"),
                    Arg::boolean("-a").with_help("Enable User/Password authentication for SOCKS5"),
                    Arg::string("username", false).with_help("Username for SOCKS5 proxy"),
                    Arg::string("password", false).with_help("Password for SOCKS5 proxy"),
                ],
            )?,
            leaf("stop", "Stop a SOCKS proxy server", "socks stop 1080", vec![
                Arg::int("port", true),
            ])?,
        ])?,
        leaf(
            "shell",
            &format!("Execute command via {shell}"),
            os(windows, "shell whoami /all", "shell id"),
            vec![Arg::string("cmd", true)],
        )?,
        leaf(
            "upload",
            "Upload a file",
            os(
                windows,
                "upload /tmp/file.txt C:\\Temp\\file.txt",
                "upload /tmp/file.txt /root/file.txt",
            ),
            vec![Arg::file("local_file", true), Arg::string("remote_path", false)],
        )?,
        leaf(
            "zip",
            "Archive (zip) a file or directory",
            os(windows, "zip C:\\backup C:\\Temp\\qwe.zip", "zip /home/test /tmp/qwe.zip"),
            vec![Arg::string("path", true), Arg::string("zip_path", true)],
        )?,
    ])
}

/// Payload form with the OS combo preselected to the variant's OS.
///
/// The format list and the Windows 7 switch follow the OS selection.
pub fn form(variant: Variant) -> Result<FormSchema> {
    let mut form = FormBuilder::new();

    let os_label = form.create_field(None, FieldOptions::label("OS:"))?;
    form.create_field(
        Some("os"),
        FieldOptions::combo(OsFamily::ALL.map(OsFamily::as_str)),
    )?;
    let arch_label = form.create_field(None, FieldOptions::label("Arch:"))?;
    form.create_field(Some("arch"), FieldOptions::combo(["amd64", "arm64"]))?;
    let format_label = form.create_field(None, FieldOptions::label("Format:"))?;
    form.create_field(Some("format"), FieldOptions::combo(["Binary EXE"]))?;
    form.create_field(Some("win7"), FieldOptions::check("Windows 7 support"))?;
    let hline = form.create_field(None, FieldOptions::hline())?;
    let timeout_label = form.create_field(None, FieldOptions::label("Reconnect timeout:"))?;
    form.create_field(
        Some("reconn_timeout"),
        FieldOptions::text_line("10").with_placeholder("seconds"),
    )?;
    let count_label = form.create_field(None, FieldOptions::label("Reconnect count:"))?;
    form.create_field(
        Some("reconn_count"),
        FieldOptions::spin(0, 1_000_000_000, 1_000_000_000),
    )?;

    form.layout(&os_label, 0, 0, 1, 1)?
        .layout("os", 0, 1, 1, 1)?
        .layout(&arch_label, 1, 0, 1, 1)?
        .layout("arch", 1, 1, 1, 1)?
        .layout(&format_label, 2, 0, 1, 1)?
        .layout("format", 2, 1, 1, 1)?
        .layout("win7", 3, 1, 1, 1)?
        .layout(&hline, 4, 0, 1, 2)?
        .layout(&timeout_label, 5, 0, 1, 1)?
        .layout("reconn_timeout", 5, 1, 1, 1)?
        .layout(&count_label, 6, 0, 1, 1)?
        .layout("reconn_count", 6, 1, 1, 1)?;

    form.on_change("os", ["format", "win7"], |os| {
        let (format, windows) = match os {
            FieldValue::Text(text) if text == "windows" => ("Binary EXE", true),
            FieldValue::Text(text) if text == "linux" => ("Binary .ELF", false),
            _ => ("Binary Mach-O", false),
        };
        vec![
            ("format".to_string(), Mutation::SetItems(vec![format.to_string()])),
            ("win7".to_string(), Mutation::SetVisible(windows)),
        ]
    });

    let mut schema = form.finalize(variant)?;
    schema.apply_change("os", FieldValue::Text(variant.os.as_str().to_string()))?;
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_variants_share_a_group() {
        let bundle = build(&CatalogConfig::default()).unwrap();
        let linux = bundle.commands.select_for_variant(&LINUX);
        let macos = bundle.commands.select_for_variant(&MACOS);
        let windows = bundle.commands.select_for_variant(&WINDOWS);

        assert_eq!(linux, macos);
        assert_eq!(linux.command_names(), windows.command_names());
        assert_eq!(
            windows.find(&["shell"]).unwrap().description.as_deref(),
            Some("Execute command via cmd.exe")
        );
        assert_eq!(
            linux.find(&["shell"]).unwrap().usage_example.as_deref(),
            Some("shell id")
        );
    }

    #[test]
    fn test_form_preselects_variant_os() {
        let schema = form(LINUX).unwrap();
        let values = schema.container().to_json();
        assert_eq!(values["os"], "linux");
        assert_eq!(values["format"], "Binary .ELF");
        assert!(!schema.field("win7").unwrap().is_visible());

        let schema = form(WINDOWS).unwrap();
        assert_eq!(schema.container().to_json()["format"], "Binary EXE");
        assert!(schema.field("win7").unwrap().is_visible());
    }

    #[test]
    fn test_format_follows_os() {
        let mut schema = form(WINDOWS).unwrap();
        let applied = schema.apply_change("os", "macos".into()).unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(
            schema.container().value("format"),
            Some(FieldValue::Text("Binary Mach-O".into()))
        );
        assert!(!schema.field("win7").unwrap().is_visible());
    }
}
