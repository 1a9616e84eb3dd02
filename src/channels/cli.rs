//! CLI channel: stdin/stdout REPL driving a single conversation.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::conversation::{Collector, ConversationState};
use crate::error::ChannelError;

/// Command that discards the current conversation and starts a new one.
pub const RESTART_COMMAND: &str = "/restart";
/// Command that ends the REPL.
pub const QUIT_COMMAND: &str = "/quit";

/// A simple CLI channel that reads answers from stdin and writes replies to stdout.
pub struct CliChannel {
    collector: Arc<Collector>,
}

impl CliChannel {
    pub fn new(collector: Arc<Collector>) -> Self {
        Self { collector }
    }

    /// Run the REPL on the process's stdin/stdout until EOF or `/quit`.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer, true).await
    }

    /// Drive one conversation over arbitrary line-based I/O.
    ///
    /// Blank lines are skipped. When `interactive` is set, a `> ` prompt is
    /// printed to stderr before each read.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W, interactive: bool) -> Result<(), ChannelError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut state = ConversationState::new();
        let mut lines = reader.lines();

        write_reply(&mut writer, &self.collector.opening_prompt()).await?;

        loop {
            if interactive {
                eprint!("> ");
            }
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    return Err(ChannelError::Io(e));
                }
            };

            let line = line.trim();
            match line {
                "" => continue,
                QUIT_COMMAND => break,
                RESTART_COMMAND => {
                    tracing::info!("Conversation restarted");
                    state.reset();
                    write_reply(&mut writer, &self.collector.opening_prompt()).await?;
                }
                answer => {
                    let reply = self.collector.submit_answer(&mut state, answer).await;
                    write_reply(&mut writer, &reply).await?;
                }
            }
        }

        Ok(())
    }
}

async fn write_reply<W: AsyncWrite + Unpin>(writer: &mut W, reply: &str) -> Result<(), ChannelError> {
    let framed = format!("\n{reply}\n\n");
    writer
        .write_all(framed.as_bytes())
        .await
        .map_err(|e| ChannelError::SendFailed {
            name: "cli".to_string(),
            reason: e.to_string(),
        })?;
    writer.flush().await.map_err(|e| ChannelError::SendFailed {
        name: "cli".to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::conversation::{Slot, TERMINATED_MESSAGE};
    use crate::error::DispatchError;
    use crate::pipeline::{AnalysisConfig, DispatchRequest, PipelineResult, PipelineRunner};

    struct EchoRunner;

    #[async_trait]
    impl PipelineRunner for EchoRunner {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, request: &DispatchRequest) -> Result<PipelineResult, DispatchError> {
            Ok(PipelineResult {
                raw_decision: format!("analyzed {} with {:?}", request.ticker, request.analysts),
                recommendation: "HOLD".into(),
            })
        }
    }

    async fn run_script(script: &str) -> String {
        let channel = CliChannel::new(Arc::new(Collector::new(
            Arc::new(EchoRunner),
            AnalysisConfig::default(),
        )));
        let mut out = Vec::new();
        channel
            .serve(BufReader::new(script.as_bytes()), &mut out, false)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn full_conversation_over_lines() {
        let out = run_script("aapl\n2024-01-02\n\nmarket,social\n1\nq\nd\nmore\n").await;

        assert!(out.contains(Slot::Ticker.prompt()));
        assert!(out.contains(Slot::DeepModel.prompt()));
        assert!(out.contains("✅ Final Trading Decision for AAPL:"));
        assert!(out.contains(r#"analyzed AAPL with ["market", "social"]"#));
        assert!(out.trim_end().ends_with(TERMINATED_MESSAGE));
    }

    #[tokio::test]
    async fn restart_starts_a_new_conversation() {
        let out = run_script("aapl\n/restart\nmsft\ntoday\nnews\n2\nq\nd\n").await;

        assert_eq!(out.matches("👋 Welcome").count(), 2);
        assert!(out.contains("Final Trading Decision for MSFT"));
        assert!(!out.contains("Final Trading Decision for AAPL"));
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let out = run_script("aapl\n/quit\n2024-01-02\n").await;
        assert!(out.contains(Slot::AnalysisDate.prompt()));
        assert!(!out.contains(Slot::Analysts.prompt()));
    }
}
