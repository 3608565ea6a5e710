// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line-oriented host: stands in for the page view on a terminal or a pipe.
//
// Each input line is either a raw bridge message from the page (JSON) or a
// navigation event for the readiness machine:
//
//   @load-start            the page started loading
//   @load-end              the page finished loading
//   @load-error <reason>   the page failed to load
//   @retry                 the user pressed Retry on the error view
//   @quit                  unmount and exit
//
// Messages injected into the page are written as `page< {envelope}` and shell
// instructions (overlay, reload, error view) as `shell: ...`.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use webshell_core::error::{Result, WebshellError};
use webshell_core::human_errors::humanize_error;
use webshell_host::{DismissReason, HostCapabilities, ReadinessController, ShellCommand, Signal};
use webshell_protocol::transport::parse_delivery_script;
use webshell_protocol::{BridgeSession, PageChannel};

use crate::services::app_services::AppServices;

/// Where page injections and shell instructions are written.
pub type ConsoleOutput = Arc<Mutex<Box<dyn Write + Send>>>;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Page(String),
    Signal(Signal),
    Quit,
    Unknown(String),
    Empty,
}

pub fn parse_line(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Empty;
    }
    let Some(command) = line.strip_prefix('@') else {
        return ConsoleInput::Page(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));
    match name {
        "load-start" => ConsoleInput::Signal(Signal::LoadStart),
        "load-end" => ConsoleInput::Signal(Signal::LoadEnd),
        "load-error" => {
            let reason = if rest.is_empty() { "unknown error" } else { rest };
            ConsoleInput::Signal(Signal::LoadError(reason.to_string()))
        }
        "retry" => ConsoleInput::Signal(Signal::ManualRetry),
        "quit" => ConsoleInput::Quit,
        _ => ConsoleInput::Unknown(name.to_string()),
    }
}

/// Page channel writing injected scripts to the console output.
pub struct ConsoleChannel {
    output: ConsoleOutput,
}

impl ConsoleChannel {
    pub fn new(output: ConsoleOutput) -> Self {
        Self { output }
    }
}

impl PageChannel for ConsoleChannel {
    fn inject_script(&self, script: &str) -> Result<()> {
        match parse_delivery_script(script) {
            Some(envelope) => write_line(&self.output, &format!("page< {}", envelope.to_json()?))?,
            None => write_line(&self.output, &format!("inject: script ({} bytes)", script.len()))?,
        }
        Ok(())
    }
}

fn write_line(output: &ConsoleOutput, line: &str) -> Result<()> {
    let mut out = output.lock().unwrap_or_else(PoisonError::into_inner);
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

fn describe(command: &ShellCommand) -> String {
    match command {
        ShellCommand::DismissOverlay { reason } => match reason {
            DismissReason::Ready => "shell: dismiss overlay (page ready)".into(),
            DismissReason::TimedOut => "shell: dismiss overlay (timed out)".into(),
        },
        ShellCommand::Reload { attempt } => format!("shell: reload (attempt {attempt})"),
        ShellCommand::ShowErrorView(err) => {
            format!("shell: error view: {} {}", err.message, err.suggestion)
        }
        ShellCommand::HideErrorView => "shell: hide error view".into(),
    }
}

/// The error view shown when the session itself fails.
fn failure_line(err: &WebshellError) -> String {
    let human = humanize_error(err);
    format!("shell: error view: {} {}", human.message, human.suggestion)
}

/// Report a fatal session error on the console.
pub fn report_failure(output: &ConsoleOutput, err: &WebshellError) {
    if let Err(e) = write_line(output, &failure_line(err)) {
        warn!(error = %e, "error view not written");
    }
}

/// Mount one bridge session on `input`/`output` and run it until `@quit` or
/// end of input.
pub async fn run<R>(services: &AppServices, input: R, output: ConsoleOutput) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let config = services.config();
    let (controller, mut commands) = ReadinessController::spawn(config.readiness.clone());
    let (notice_tx, mut notices) = mpsc::unbounded_channel();

    let host = HostCapabilities {
        account: Arc::clone(services.account()),
        readiness: controller.signals(),
        notices: notice_tx,
    };
    let channel = Arc::new(ConsoleChannel::new(Arc::clone(&output)));
    let session = BridgeSession::mount(services.bridge(), channel, move |registry| {
        host.register(registry)
    });

    info!(site = %config.site_url, "loading site");
    session.announce_ready()?;
    let notice = services.push().register().await;
    session.push_token(&notice)?;

    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("console input closed");
                    break;
                };
                match parse_line(&line) {
                    ConsoleInput::Page(raw) => {
                        in_flight.retain(|task| !task.is_finished());
                        if let Some(task) = session.on_page_message(&raw) {
                            in_flight.push(task);
                        }
                    }
                    ConsoleInput::Signal(signal) => controller.signal(signal),
                    ConsoleInput::Quit => break,
                    ConsoleInput::Unknown(name) => {
                        write_line(&output, &format!("error: unknown command @{name}"))?;
                    }
                    ConsoleInput::Empty => {}
                }
            }
            Some(command) = commands.recv() => {
                write_line(&output, &describe(&command))?;
                if let ShellCommand::Reload { .. } = command {
                    session.announce_ready()?;
                }
            }
            Some(notice) = notices.recv() => {
                if let Err(e) = session.push_token(&notice) {
                    warn!(error = %e, "push token notice not delivered");
                }
            }
        }
    }

    for task in in_flight {
        if let Err(e) = task.await {
            warn!(error = %e, "bridge dispatch task failed");
        }
    }
    if let Some(stopping) = session.close()
        && let Err(e) = stopping.await
    {
        warn!(error = %e, "recording shutdown task failed");
    }
    controller.shutdown().await;
    info!("session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
        }
    }

    #[test]
    fn parses_navigation_commands() {
        assert_eq!(parse_line("@load-start"), ConsoleInput::Signal(Signal::LoadStart));
        assert_eq!(parse_line("  @load-end "), ConsoleInput::Signal(Signal::LoadEnd));
        assert_eq!(
            parse_line("@load-error net::ERR_INTERNET_DISCONNECTED"),
            ConsoleInput::Signal(Signal::LoadError("net::ERR_INTERNET_DISCONNECTED".into()))
        );
        assert_eq!(
            parse_line("@load-error"),
            ConsoleInput::Signal(Signal::LoadError("unknown error".into()))
        );
        assert_eq!(parse_line("@retry"), ConsoleInput::Signal(Signal::ManualRetry));
        assert_eq!(parse_line("@quit"), ConsoleInput::Quit);
        assert_eq!(parse_line("@reboot now"), ConsoleInput::Unknown("reboot".into()));
        assert_eq!(parse_line("   "), ConsoleInput::Empty);
    }

    #[test]
    fn other_lines_go_to_the_bridge() {
        let raw = r#"{"type":"VIBRATE","data":{}}"#;
        assert_eq!(parse_line(raw), ConsoleInput::Page(raw.into()));
    }

    #[test]
    fn session_failures_use_the_error_view_text() {
        let captured = Captured::default();
        let output: ConsoleOutput = Arc::new(Mutex::new(Box::new(captured.clone())));
        let err = WebshellError::PermissionDenied("camera".into());

        report_failure(&output, &err);

        let text = captured.text();
        assert!(text.starts_with("shell: error view: "), "{text}");
        assert!(text.contains(&humanize_error(&err).suggestion), "{text}");
    }

    #[tokio::test]
    async fn answers_page_requests_until_quit() {
        let services =
            AppServices::fallback(webshell_bridge::platform_bridge()).expect("services");
        let captured = Captured::default();
        let output: ConsoleOutput = Arc::new(Mutex::new(Box::new(captured.clone())));
        let input: &[u8] = b"{\"type\":\"GET_DEVICE_INFO\",\"id\":\"1\"}\nnot json\n@bogus\n@quit\n{\"type\":\"VIBRATE\",\"id\":\"2\"}\n";

        run(&services, input, output).await.expect("run");

        let text = captured.text();
        assert!(text.contains("inject: script"));
        assert!(text.contains("\"BRIDGE_READY\""));
        assert!(text.contains("\"PUSH_TOKEN\""));
        assert!(text.contains("\"GET_DEVICE_INFO_RESPONSE\""));
        assert!(text.contains("error: unknown command @bogus"));
        assert!(!text.contains("VIBRATE_RESPONSE"));
    }

    #[tokio::test]
    async fn end_of_input_closes_the_session() {
        let services =
            AppServices::fallback(webshell_bridge::platform_bridge()).expect("services");
        let captured = Captured::default();
        let output: ConsoleOutput = Arc::new(Mutex::new(Box::new(captured.clone())));
        let input: &[u8] = b"{\"type\":\"USER_AUTH\",\"data\":{\"userId\":\"u1\"}}\n";

        run(&services, input, output).await.expect("run");

        let user = webshell_host::store::lock_store(services.store())
            .current_user()
            .expect("query")
            .expect("user");
        assert_eq!(user.user_id, "u1");
    }
}
