//! The beacon agent: Windows implants over HTTP, SMB and TCP listeners.
//!
//! HTTP beacons get the full command group, including `sleep` and the
//! `shell` alias. Pivot beacons (SMB, TCP) check in through a parent and
//! get the same group without them.

use agent_schema_core::{
    ArgValue, ArgumentSpec as Arg, CommandRegistry, CommandSpec, HookContext, HookOutcome,
    Invocation, OsFamily, SchemaError, Transport, Variant,
};
use agent_schema_forms::{FieldOptions, FieldValue, FormBuilder, FormRegistry, FormSchema, Mutation};
use tracing::info;

use super::{AgentBundle, group, leaf, node};
use crate::config::CatalogConfig;
use crate::error::Result;

pub const NAME: &str = "beacon";

pub const HTTP: Variant = Variant::new(Transport::Http, OsFamily::Windows);
pub const SMB: Variant = Variant::new(Transport::Smb, OsFamily::Windows);
pub const TCP: Variant = Variant::new(Transport::Tcp, OsFamily::Windows);

/// Interpreter the `shell` alias runs its payload through.
pub const CMD_EXE: &str = "C:\\Windows\\System32\\cmd.exe";

/// Commands whose hook rewrites into another top-level command.
const ALIASES: &[(&str, &str)] = &[("shell", "ps")];

const FORMATS: [&str; 4] = ["Exe", "Service Exe", "DLL", "Shellcode"];
const SERVICE_EXE: &str = "Service Exe";

pub fn build(config: &CatalogConfig) -> Result<AgentBundle> {
    let external = group(NAME, commands(true)?, ALIASES, config)?;
    let internal = group(NAME, commands(false)?, ALIASES, config)?;

    let commands = CommandRegistry::builder()
        .register(external, [HTTP])
        .register(internal, [SMB, TCP])
        .build()?;
    let forms = FormRegistry::from_schemas([form(HTTP)?, form(SMB)?, form(TCP)?])?;

    info!(agent = NAME, variants = commands.len(), "built agent");
    Ok(AgentBundle {
        name: NAME.to_string(),
        commands,
        forms,
    })
}

fn commands(external: bool) -> std::result::Result<Vec<CommandSpec>, SchemaError> {
    let mut list = vec![
        leaf("cat", "Read first 2048 bytes of the specified file", "cat C:\\file.exe", vec![
            Arg::string("path", true),
        ])?,
        leaf("cd", "Change current working directory", "cd C:\\Windows", vec![
            Arg::string("path", true),
        ])?,
        leaf("cp", "Copy file", "cp src.txt dst.txt", vec![
            Arg::string("src", true),
            Arg::string("dst", true),
        ])?,
        leaf("disks", "Lists mounted drives on current system", "disks", vec![])?,
        leaf("download", "Download a file", "download C:\\Temp\\file.txt", vec![
            Arg::string("file", true),
        ])?,
        node("execute", "Execute [bof] in the current process's memory", vec![leaf(
            "bof",
            "Execute Beacon Object File",
            "execute bof /home/user/whoami.o",
            vec![
                Arg::file("bof", true).with_help("Path to object file"),
                Arg::string("param_data", false),
            ],
        )?])?,
        node("exfil", "Manage current downloads", vec![
            leaf("cancel", "Cancels a download", "exfil cancel 1a2b3c4d", vec![
                Arg::string("file_id", true),
            ])?,
            leaf("start", "Resumes a download that has been stopped", "exfil start 1a2b3c4d", vec![
                Arg::string("file_id", true),
            ])?,
            leaf("stop", "Stops a download that is in progress", "exfil stop 1a2b3c4d", vec![
                Arg::string("file_id", true),
            ])?,
        ])?,
        leaf("getuid", "Prints the User ID associated with the current token", "getuid", vec![])?,
        node("job", "Long-running tasks manager", vec![
            leaf("list", "List of jobs", "job list", vec![])?,
            leaf("kill", "Kill a specified job", "job kill 1a2b3c4d", vec![
                Arg::string("task_id", true),
            ])?,
        ])?,
        node("link", "Connect to pivot agents", vec![
            leaf("smb", "Connect to an SMB agent and re-establish control of it", "link smb 192.168.1.2 pipe_a1b2", vec![
                Arg::string("target", true),
                Arg::string("pipename", true),
            ])?,
            leaf("tcp", "Connect to a TCP agent and re-establish control of it", "link tcp 192.168.1.2 8888", vec![
                Arg::string("target", true),
                Arg::int("port", true),
            ])?,
        ])?,
        leaf("ls", "Lists files in a folder", "ls C:\\Windows", vec![
            Arg::string("directory", false).with_default("."),
        ])?,
        node("lportfwd", "Managing local port forwarding", vec![
            leaf("start", "Start local port forwarding from server via agent", "lportfwd start 127.0.0.1 8080 192.168.1.1 8080", vec![
                Arg::string("lhost", false)
                    .with_default("0.0.0.0")
                    .with_help("Listening interface address on server"),
                Arg::int("lport", true).with_help("Listen port on server"),
                Arg::string("fwdhost", true).with_help("Remote forwarding address"),
                Arg::int("fwdport", true).with_help("Remote forwarding port"),
            ])?,
            leaf("stop", "Stop local port forwarding", "lportfwd stop 8080", vec![
                Arg::int("lport", true),
            ])?,
        ])?,
        leaf("mv", "Move file", "mv src.txt dst.txt", vec![
            Arg::string("src", true),
            Arg::string("dst", true),
        ])?,
        leaf("mkdir", "Make a directory", "mkdir C:\\Temp", vec![Arg::string("path", true)])?,
        node("profile", "Configure the payload profile for current session", vec![
            leaf("download.chunksize", "Change the exfiltrate data size for download request (default 128000)", "profile download.chunksize 512000", vec![
                Arg::int("size", true),
            ])?,
            leaf("killdate", "Set the date and time for the beacon to stop working", "profile killdate 28.02.2030 12:34:00", vec![
                Arg::string("datetime", true).with_help(
                    "Datetime 'DD.MM.YYYY hh:mm:ss' in GMT format. Set 0 to disable the option",
                ),
            ])?,
            leaf("workingtime", "Set the start and end time of the beacon activity", "profile workingtime 8:00-17:30", vec![
                Arg::string("time", true).with_help(
                    "Time interval in the format 'HH:mm(start)-HH:mm(end)'. Set 0 to disable the option",
                ),
            ])?,
        ])?,
        node("ps", "Process manager", vec![
            leaf("list", "Show process list", "ps list", vec![])?,
            leaf("kill", "Kill a process with a given PID", "ps kill 7865", vec![
                Arg::int("pid", true),
            ])?,
            leaf("run", "Run a program", "ps run -s cmd.exe \"whoami /all\"", vec![
                Arg::boolean("-s").with_help("Suspend process"),
                Arg::boolean("-o").with_help("Output to console"),
                Arg::string("program", true),
                Arg::string("args", false),
            ])?,
        ])?,
        leaf("pwd", "Print current working directory", "pwd", vec![])?,
        leaf("rev2self", "Revert to your original access token", "rev2self", vec![])?,
        leaf("rm", "Remove a file or folder", "rm C:\\Temp\\file.txt", vec![
            Arg::string("path", true),
        ])?,
        node("rportfwd", "Managing remote port forwarding", vec![
            leaf("start", "Start remote port forwarding from agent via server", "rportfwd start 8080 10.10.10.14 8080", vec![
                Arg::int("lport", true).with_help("Listen port on agent"),
                Arg::string("fwdhost", true).with_help("Remote forwarding address"),
                Arg::int("fwdport", true).with_help("Remote forwarding port"),
            ])?,
            leaf("stop", "Stop remote port forwarding", "rportfwd stop 8080", vec![
                Arg::int("lport", true),
            ])?,
        ])?,
    ];

    if external {
        list.push(leaf("sleep", "Sets sleep time", "sleep 30m5s 10", vec![
            Arg::string("sleep", true).with_help("Time in '%h%m%s' format or number of seconds"),
            Arg::int("jitter", true).with_help("Max random amount of time in % added to sleep"),
        ])?);
    }

    list.extend([
        node("socks", "Managing socks tunnels", vec![
            leaf("start", "Start a SOCKS(4a/5) proxy server and listen on a specified port", "socks start 1080 -auth user pass", vec![
                Arg::flag_string("-h", "address")
                    .with_default("0.0.0.0")
                    .with_help("Listening interface address"),
                Arg::int("port", true).with_help("Listen port"),
                Arg::boolean("-socks4").with_help("Use SOCKS4 proxy (Default SOCKS5)"),
                Arg::boolean("-auth").with_help("Enable User/Password authentication for SOCKS5"),
                Arg::string("username", false).with_help("Username for SOCKS5 proxy"),
                Arg::string("password", false).with_help("Password for SOCKS5 proxy"),
            ])?,
            leaf("stop", "Stop a SOCKS proxy server", "socks stop 1080", vec![
                Arg::int("port", true),
            ])?,
        ])?,
        node("terminate", "Terminate the session", vec![
            leaf("thread", "Terminate the main beacon thread (without terminating the process)", "terminate thread", vec![])?,
            leaf("process", "Terminate the beacon process", "terminate process", vec![])?,
        ])?,
        leaf("unlink", "Disconnect from a pivot agent", "unlink 1a2b3c4d", vec![
            Arg::string("id", true),
        ])?,
        leaf("upload", "Upload a file", "upload /tmp/file.txt C:\\Temp\\file.txt", vec![
            Arg::file("local_file", true),
            Arg::string("remote_path", false),
        ])?,
    ]);

    if external {
        list.push(shell()?);
    }
    Ok(list)
}

/// `shell <text>` is an alias for `ps run -o cmd.exe "/c <text>"`.
fn shell() -> std::result::Result<CommandSpec, SchemaError> {
    let shell = leaf("shell", "Execute command via cmd.exe", "shell whoami /all", vec![
        Arg::string("command", true),
    ])?
    .with_long_help("Runs the text through cmd.exe as `ps run -o` with output captured.")
    .with_pre_hook(shell_hook);
    Ok(shell)
}

fn shell_hook(ctx: &HookContext<'_>) -> HookOutcome {
    let text = ctx.trailing_text();
    if ctx.arg_count() == 0 || text.is_empty() {
        return HookOutcome::Message("usage: shell <command>".to_string());
    }
    HookOutcome::Rewrite(
        Invocation::new(["ps", "run"])
            .flag("-o")
            .arg("program", ArgValue::String(CMD_EXE.to_string()))
            .arg("args", ArgValue::String(format!("/c {text}"))),
    )
}

/// Payload form. Sleep settings only apply to HTTP beacons.
pub fn form(variant: Variant) -> std::result::Result<FormSchema, agent_schema_forms::SchemaError> {
    let mut form = FormBuilder::new();

    let arch_label = form.create_field(None, FieldOptions::label("Arch:"))?;
    form.create_field(Some("arch"), FieldOptions::combo(["x64", "x86"]))?;
    let format_label = form.create_field(None, FieldOptions::label("Format:"))?;
    form.create_field(Some("format"), FieldOptions::combo(FORMATS))?;
    let sleep_label = form.create_field(None, FieldOptions::label("Sleep (Jitter %):"))?;
    form.create_field(
        Some("sleep"),
        FieldOptions::text_line("4s").with_placeholder("1h 2m 5s"),
    )?;
    form.create_field(Some("jitter"), FieldOptions::spin(0, 100, 0))?;
    form.create_field(Some("is_killdate"), FieldOptions::check("Set 'killdate'"))?;
    form.create_field(Some("kill_date"), FieldOptions::date("dd.MM.yyyy"))?;
    form.create_field(Some("kill_time"), FieldOptions::time("HH:mm:ss"))?;
    form.create_field(Some("is_workingtime"), FieldOptions::check("Set 'workingtime'"))?;
    form.create_field(Some("start_time"), FieldOptions::time("HH:mm"))?;
    form.create_field(Some("end_time"), FieldOptions::time("HH:mm"))?;
    let svc_label = form.create_field(None, FieldOptions::label("Service Name:"))?;
    form.create_field(Some("svcname"), FieldOptions::text_line("AgentService"))?;

    form.layout(&arch_label, 0, 0, 1, 1)?
        .layout("arch", 0, 1, 1, 2)?
        .layout(&format_label, 1, 0, 1, 1)?
        .layout("format", 1, 1, 1, 2)?
        .layout(&sleep_label, 2, 0, 1, 1)?
        .layout("sleep", 2, 1, 1, 1)?
        .layout("jitter", 2, 2, 1, 1)?
        .layout("is_killdate", 3, 0, 1, 1)?
        .layout("kill_date", 3, 1, 1, 1)?
        .layout("kill_time", 3, 2, 1, 1)?
        .layout("is_workingtime", 4, 0, 1, 1)?
        .layout("start_time", 4, 1, 1, 1)?
        .layout("end_time", 4, 2, 1, 1)?
        .layout(&svc_label, 5, 0, 1, 1)?
        .layout("svcname", 5, 1, 1, 2)?;

    if variant.transport != Transport::Http {
        for key in [sleep_label.as_str(), "sleep", "jitter"] {
            form.set_visible(key, false)?;
        }
    }
    form.set_visible(&svc_label, false)?
        .set_visible("svcname", false)?;

    let targets = [svc_label.clone(), "svcname".to_string()];
    form.on_change("format", targets, move |format| {
        let shown = *format == FieldValue::Text(SERVICE_EXE.to_string());
        vec![
            (svc_label.clone(), Mutation::SetVisible(shown)),
            ("svcname".to_string(), Mutation::SetVisible(shown)),
        ]
    });

    form.finalize(variant)
}
