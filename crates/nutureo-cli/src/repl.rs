//! Line-oriented chat loop
//!
//! One utterance per line. `sair`, `exit` or `quit` (any case) end the
//! conversation; so do end of input and the shutdown signal. An interrupted
//! call is abandoned; turns it already stored stay stored.

use std::future::Future;

use agent_core::{SessionId, SessionRunner};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const EXIT_COMMANDS: [&str; 3] = ["sair", "exit", "quit"];

const GREETING: &str = "🤖 Nutureo está pronto para ajudá-lo com suas dúvidas nutricionais!\n\
Digite 'sair' para encerrar a conversa.\n\n";
const PROMPT: &str = "Você: ";
const FAREWELL: &str = "Nutureo: Até a próxima! 🥗 Mantenha uma alimentação saudável.\n";
const INTERRUPTED: &str = "\n👋 Encerrando sessão com Nutureo. Até logo!\n";

pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    EXIT_COMMANDS.iter().any(|cmd| line.eq_ignore_ascii_case(cmd))
}

/// Drive the conversation until exit, end of input, or `shutdown` resolves
pub async fn run<R, W, S>(
    runner: &SessionRunner,
    session: &SessionId,
    input: R,
    mut out: W,
    shutdown: S,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    out.write_all(GREETING.as_bytes()).await?;

    loop {
        out.write_all(PROMPT.as_bytes()).await?;
        out.flush().await?;

        let line = tokio::select! {
            _ = &mut shutdown => return interrupted(&mut out).await,
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            out.write_all(b"\n").await?;
            out.write_all(FAREWELL.as_bytes()).await?;
            break;
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if is_exit_command(text) {
            out.write_all(FAREWELL.as_bytes()).await?;
            break;
        }

        let reply = tokio::select! {
            _ = &mut shutdown => return interrupted(&mut out).await,
            reply = runner.run(session, text) => reply,
        };

        let answer = match reply {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(%session, error = %e, "Message failed");
                e.user_message()
            }
        };
        out.write_all(format!("Nutureo: {answer}\n\n").as_bytes()).await?;
    }

    out.flush().await
}

async fn interrupted<W: AsyncWrite + Unpin>(out: &mut W) -> std::io::Result<()> {
    out.write_all(INTERRUPTED.as_bytes()).await?;
    out.flush().await
}
