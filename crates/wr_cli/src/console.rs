use std::io::Write;
use std::time::Duration;

use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;
use wr_core::{Article, ArticleSource, Result};
use wr_sources::prefetch::fetch_with_timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

pub fn parse_answer(line: &str) -> Option<Answer> {
    match line.trim() {
        "1" => Some(Answer::Yes),
        "2" => Some(Answer::No),
        _ => None,
    }
}

/// Keeps asking the source until it hands back an article.
pub async fn fetch_until_success<W: Write>(
    source: &dyn ArticleSource,
    timeout: Duration,
    retry_delay: Duration,
    out: &mut W,
) -> Result<Article> {
    let mut attempt = 1u32;
    loop {
        queue!(
            out,
            Print("Looking for an interesting article, please wait..."),
            cursor::MoveToNextLine(1)
        )?;
        out.flush()?;
        match fetch_with_timeout(source, timeout).await {
            Ok(article) => return Ok(article),
            Err(e) => {
                warn!("⚠️ Attempt {} failed ({:?}): {}", attempt, e.kind(), e);
                attempt += 1;
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}

fn show<W: Write>(article: &Article, out: &mut W) -> Result<()> {
    queue!(
        out,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        Print(article.title.as_str().black().on_white()),
        cursor::MoveToNextLine(2),
        Print(article.lead_paragraph().black().on_white()),
        cursor::MoveToNextLine(2),
        Print("Liked it?"),
        cursor::MoveToNextLine(1),
        Print("[1] Yes [2] No"),
        cursor::MoveToNextLine(1),
    )?;
    out.flush()?;
    Ok(())
}

/// Shows random articles until the user likes one. Returns the liked
/// article, or `None` if input ran out first.
pub async fn roll<R, W>(
    source: &dyn ArticleSource,
    timeout: Duration,
    retry_delay: Duration,
    input: R,
    out: &mut W,
) -> Result<Option<Article>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        let article = fetch_until_success(source, timeout, retry_delay, out).await?;
        show(&article, out)?;
        loop {
            let Some(line) = lines.next_line().await? else {
                return Ok(None);
            };
            match parse_answer(&line) {
                Some(Answer::Yes) => return Ok(Some(article)),
                Some(Answer::No) => break,
                None => {
                    queue!(out, Print("[1] Yes [2] No"), cursor::MoveToNextLine(1))?;
                    out.flush()?;
                }
            }
        }
    }
}
