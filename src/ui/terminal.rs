//! Interactive terminal loop for the chat view.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::session::ConversationManager;

use super::view::{ChatView, ViewCommand};

const HELP: &str = "\
Commands:
  <text>        send a message
  /new          start a new chat
  /load <n>     open chat n from the sidebar
  /delete <n>   delete chat n
  /clear        delete all chats
  /sidebar      show or hide the chat list
  /expand       show the full transcript or only the latest messages
  /quit         leave
";

/// Run the chat loop on stdin/stdout until `/quit` or end of input.
pub async fn run(manager: ConversationManager, view: ChatView) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    run_with_io(manager, view, stdin, stdout).await
}

/// Run the chat loop over arbitrary input/output streams.
pub async fn run_with_io<R, W>(
    mut manager: ConversationManager,
    mut view: ChatView,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output.write_all(view.render(&manager).as_bytes()).await?;

    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ViewCommand::parse(&line) {
            ViewCommand::Send(text) => {
                view.input = text;
                if !view.can_send(&manager) {
                    continue;
                }
                let text = std::mem::take(&mut view.input);
                let turn = match manager.begin_send(&text) {
                    Ok(turn) => turn,
                    Err(rejected) => {
                        tracing::debug!(reason = %rejected, "Send not started");
                        continue;
                    }
                };
                output
                    .write_all(view.render_status(&manager).as_bytes())
                    .await?;
                output.flush().await?;

                let relay = manager.relay();
                let result = relay.send_chat(turn.request()).await;
                manager.complete_send(turn, result);
                output
                    .write_all(view.render_transcript(&manager).as_bytes())
                    .await?;
                output
                    .write_all(view.render_status(&manager).as_bytes())
                    .await?;
            }
            ViewCommand::NewChat => {
                manager.new_chat();
                output.write_all(view.render(&manager).as_bytes()).await?;
            }
            ViewCommand::Load(position) => {
                if let Some(id) = ChatView::chat_id_at(&manager, position) {
                    manager.load_chat(&id);
                }
                output.write_all(view.render(&manager).as_bytes()).await?;
            }
            ViewCommand::Delete(position) => {
                if let Some(id) = ChatView::chat_id_at(&manager, position) {
                    manager.delete_chat(&id);
                }
                output
                    .write_all(view.render_sidebar(&manager).as_bytes())
                    .await?;
            }
            ViewCommand::ClearAll => {
                manager.clear_all_chats();
                output.write_all(view.render(&manager).as_bytes()).await?;
            }
            ViewCommand::ToggleSidebar => {
                view.toggle_sidebar();
                output.write_all(view.render(&manager).as_bytes()).await?;
            }
            ViewCommand::TogglePanel => {
                view.toggle_panel();
                output
                    .write_all(view.render_transcript(&manager).as_bytes())
                    .await?;
            }
            ViewCommand::Help => output.write_all(HELP.as_bytes()).await?,
            ViewCommand::Quit => break,
            ViewCommand::Unknown(raw) => {
                output
                    .write_all(format!("Unknown command: {raw} (try /help)\n").as_bytes())
                    .await?;
            }
        }
    }

    output.flush().await?;
    Ok(())
}
