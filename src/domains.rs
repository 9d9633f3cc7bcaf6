use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Reads one domain per line. Lines are trimmed; blank lines are kept so that they
/// show up in the report instead of silently disappearing.
pub async fn read_domains<R: AsyncBufRead + Unpin>(reader: R) -> std::io::Result<Vec<String>> {
    let mut lines = reader.lines();
    let mut out = Vec::new();
    while let Some(line) = lines.next_line().await? {
        out.push(line.trim().to_string());
    }
    Ok(out)
}
