//! Append-only per-session log of incoming messages.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;

/// Writes `<dir>/<session>.log`, one line per incoming message.
#[derive(Debug, Clone)]
pub struct MessageLog {
    dir: PathBuf,
}

impl MessageLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.log"))
    }

    /// `[<ISO-8601>] <sender>: <body>\n`
    pub fn format_line(at: DateTime<Utc>, sender: &str, body: &str) -> String {
        format!(
            "[{}] {}: {}\n",
            at.to_rfc3339_opts(SecondsFormat::Millis, true),
            sender,
            body
        )
    }

    pub async fn append(
        &self,
        session_id: &str,
        at: DateTime<Utc>,
        sender: &str,
        body: &str,
    ) -> crate::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(session_id))
            .await?;
        file.write_all(Self::format_line(at, sender, body).as_bytes())
            .await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn line_uses_iso_timestamp_with_millis() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let line = MessageLog::format_line(at, "123@s.whatsapp.net", "hi there");
        assert_eq!(line, "[2024-03-01T12:30:05.000Z] 123@s.whatsapp.net: hi there\n");
    }

    #[tokio::test]
    async fn append_creates_directory_and_accumulates() {
        let tmp = tempfile::tempdir().unwrap();
        let log = MessageLog::new(tmp.path().join("logs"));
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        log.append("alpha", at, "1@s.whatsapp.net", "one").await.unwrap();
        log.append("alpha", at, "2@s.whatsapp.net", "").await.unwrap();

        let contents = std::fs::read_to_string(log.path_for("alpha")).unwrap();
        assert_eq!(
            contents,
            "[2024-03-01T00:00:00.000Z] 1@s.whatsapp.net: one\n\
             [2024-03-01T00:00:00.000Z] 2@s.whatsapp.net: \n"
        );
        assert!(!log.path_for("beta").exists());
    }
}
