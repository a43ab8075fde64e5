//! Line-oriented terminal channel
//!
//! Input lines are read on a dedicated OS thread and handed over through a
//! channel. A pending read therefore never holds up runtime shutdown when the
//! workflow is cancelled while waiting on the human.

use async_trait::async_trait;
use research_core::{ChannelError, HumanChannel};
use std::io::{self, BufRead};
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::{mpsc, Mutex};

type Line = io::Result<String>;

/// Human channel over a line source and a writer, stdin/stdout by default
pub(crate) struct ConsoleChannel<W> {
    input: Mutex<mpsc::Receiver<Line>>,
    output: Mutex<W>,
}

impl ConsoleChannel<Stdout> {
    /// Channel on the process terminal
    pub(crate) fn stdio() -> io::Result<Self> {
        Self::new(io::BufReader::new(io::stdin()), tokio::io::stdout())
    }
}

impl<W> ConsoleChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub(crate) fn new<R>(input: R, output: W) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name("console-input".to_string())
            .spawn(move || forward_lines(input, &tx))?;

        Ok(Self {
            input: Mutex::new(rx),
            output: Mutex::new(output),
        })
    }

    #[cfg(test)]
    pub(crate) fn into_output(self) -> W {
        self.output.into_inner()
    }

    async fn write_lines(&self, lines: &[String]) -> Result<(), ChannelError> {
        let mut out = self.output.lock().await;
        for line in lines {
            out.write_all(line.as_bytes()).await?;
            out.write_all(b"\n").await?;
        }
        out.flush().await?;
        Ok(())
    }

    async fn ask(&self, prompt: &str) -> Result<String, ChannelError> {
        self.write_lines(&[prompt.to_string()]).await?;

        match self.input.lock().await.recv().await {
            Some(Ok(line)) => Ok(line.trim_end_matches(['\n', '\r']).to_string()),
            Some(Err(e)) => Err(e.into()),
            None => Err(ChannelError::InputClosed),
        }
    }
}

/// Blocking reader loop; ends on EOF, read error or a dropped receiver
fn forward_lines<R: BufRead>(mut input: R, tx: &mpsc::Sender<Line>) {
    loop {
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => {
                if tx.blocking_send(Ok(line)).is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        }
    }
}

#[async_trait]
impl<W> HumanChannel for ConsoleChannel<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn present_task(&self, topic: &str, queries: &[String]) -> Result<(), ChannelError> {
        let mut lines = Vec::with_capacity(queries.len() + 2);
        lines.push(format!("Research Topic: {topic}"));
        lines.push("Research Queries:".to_string());
        lines.extend(queries.iter().map(|q| format!("- {q}")));
        self.write_lines(&lines).await
    }

    async fn ask_yes_no(&self, prompt: &str) -> Result<String, ChannelError> {
        self.ask(prompt).await
    }

    async fn ask_free_text(&self, prompt: &str) -> Result<String, ChannelError> {
        self.ask(prompt).await
    }

    async fn present_message(&self, message: &str) -> Result<(), ChannelError> {
        self.write_lines(&[message.to_string()]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    /// Reader that blocks until bytes arrive or the sender is dropped
    struct HeldInput(std_mpsc::Receiver<Vec<u8>>);

    impl Read for HeldInput {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.recv() {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[tokio::test]
    async fn presents_task_verbatim() {
        let channel = ConsoleChannel::new(&b""[..], Vec::new()).unwrap();
        channel
            .present_task("Eiffel Tower", &["Who?".into(), "When?".into()])
            .await
            .unwrap();

        let out = String::from_utf8(channel.into_output()).unwrap();
        assert_eq!(out, "Research Topic: Eiffel Tower\nResearch Queries:\n- Who?\n- When?\n");
    }

    #[tokio::test]
    async fn answers_are_line_stripped_only() {
        let channel = ConsoleChannel::new(&b"YES\r\n  no \n"[..], Vec::new()).unwrap();

        assert_eq!(channel.ask_yes_no("Confirm?").await.unwrap(), "YES");
        assert_eq!(channel.ask_free_text("Change?").await.unwrap(), "  no ");

        let out = String::from_utf8(channel.into_output()).unwrap();
        assert_eq!(out, "Confirm?\nChange?\n");
    }

    #[tokio::test]
    async fn empty_line_is_an_answer() {
        let channel = ConsoleChannel::new(&b"\n"[..], Vec::new()).unwrap();
        assert_eq!(channel.ask_free_text("Change?").await.unwrap(), "");
    }

    #[tokio::test]
    async fn eof_is_input_closed() {
        let channel = ConsoleChannel::new(&b""[..], Vec::new()).unwrap();
        let err = channel.ask_yes_no("Confirm?").await.unwrap_err();
        assert!(matches!(err, ChannelError::InputClosed));
    }

    #[test]
    fn abandoned_read_does_not_block_runtime_shutdown() {
        let (held, rx) = std_mpsc::channel::<Vec<u8>>();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let waited = runtime.block_on(async {
            let input = io::BufReader::new(HeldInput(rx));
            let channel = ConsoleChannel::new(input, Vec::new()).unwrap();
            tokio::time::timeout(Duration::from_millis(50), channel.ask_yes_no("Confirm?")).await
        });
        assert!(waited.is_err());

        // The reader thread is still parked in `read`; shutdown must not wait on it.
        drop(runtime);
        drop(held);
    }
}
