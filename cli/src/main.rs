//! `ptt-crawler` - command line entry point.
//!
//! ```text
//! main() -> Args::parse() -> resolve CrawlMode (flags or prompt)
//!        -> Crawler::crawl_board() -> print report
//! ```
//!
//! Logs go to stderr through `tracing`; the banner and the report go to
//! stdout. Ctrl+C stops the crawl between steps and whatever was gathered
//! is still exported.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ptt_config::CrawlerConfig;
use ptt_crawler::{
    CrawlMode, CrawlReport, CrawlRequest, CrawlSettings, Crawler, ErrorArchive, StopHandle,
    stop_pair,
};

const RULE: &str = "==================================================";
const PAGES_PROMPT: &str = "請輸入要爬取的頁數 (直接按 Enter 爬取所有頁面): ";

#[derive(Debug, Parser)]
#[command(name = "ptt-crawler", version, about = "Crawl a PTT board into CSV")]
struct Args {
    /// Board to crawl. Defaults to the configured board.
    #[arg(long, env = "PTT_BOARD")]
    board: Option<String>,

    /// Number of index pages to crawl, newest first.
    #[arg(long, conflicts_with = "all")]
    pages: Option<u32>,

    /// Crawl every page back to the first.
    #[arg(long)]
    all: bool,

    /// Index page to start from. Defaults to the newest page.
    #[arg(long)]
    start: Option<u32>,

    /// Config file. Defaults to the standard search path.
    #[arg(long, env = "PTT_CRAWLER_CONFIG")]
    config: Option<PathBuf>,
}

/// How many pages to crawl, plus a notice when the input was rejected.
#[derive(Debug, PartialEq, Eq)]
struct PageChoice {
    mode: CrawlMode,
    notice: Option<&'static str>,
}

/// Interpret the interactive page-count answer. Anything that is not a
/// positive number means the whole board.
fn parse_page_input(input: &str) -> PageChoice {
    let input = input.trim();
    if input.is_empty() {
        return PageChoice {
            mode: CrawlMode::All,
            notice: None,
        };
    }
    match input.parse::<i64>() {
        Ok(n) if n > 0 => PageChoice {
            mode: CrawlMode::Pages(u32::try_from(n).unwrap_or(u32::MAX)),
            notice: None,
        },
        Ok(_) => PageChoice {
            mode: CrawlMode::All,
            notice: Some("頁數必須大於 0，改為爬取所有頁面"),
        },
        Err(_) => PageChoice {
            mode: CrawlMode::All,
            notice: Some("輸入無效，改為爬取所有頁面"),
        },
    }
}

fn prompt_mode() -> Result<CrawlMode> {
    let mut stdout = io::stdout();
    write!(stdout, "{PAGES_PROMPT}")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read page count")?;

    let choice = parse_page_input(&line);
    if let Some(notice) = choice.notice {
        println!("{notice}");
    }
    Ok(choice.mode)
}

fn resolve_mode(args: &Args) -> Result<CrawlMode> {
    if args.all {
        return Ok(CrawlMode::All);
    }
    match args.pages {
        Some(0) => {
            println!("頁數必須大於 0，改為爬取所有頁面");
            Ok(CrawlMode::All)
        }
        Some(pages) => Ok(CrawlMode::Pages(pages)),
        None if io::stdin().is_terminal() => prompt_mode(),
        None => Ok(CrawlMode::All),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn print_banner(board: &str, mode: CrawlMode) {
    println!("=== PTT {board} 版爬蟲程式 ===");
    println!("🚀 啟動 PTT 爬蟲");
    println!("🎯 爬取版面: {board}");
    match mode {
        CrawlMode::All => {
            println!("\n📝 將爬取 {board} 版所有頁面");
            println!("⚠️  這可能需要很長時間，請耐心等候");
        }
        CrawlMode::Pages(pages) => println!("\n📝 將爬取 {board} 版 {pages} 頁"),
    }
    println!("{RULE}");
}

fn print_report(report: &CrawlReport) {
    if report.interrupted {
        println!("\n⚠️ 用戶中斷程式 (Ctrl+C)");
        println!("程式已停止");
    }

    let Some(output) = &report.output else {
        println!("\n⚠️  未取得任何資料");
        println!("📝 請檢查:");
        println!("   - 網路連線是否正常");
        println!("   - {}/ 目錄中的錯誤記錄", report.errors_dir.display());
        return;
    };

    let elapsed = report.elapsed.as_secs_f64();
    println!("\n{RULE}");
    println!("🎉 爬取任務完成！");
    println!("📊 統計報告:");
    println!("   └─ 版面: {}", report.board);
    println!("   └─ 處理頁面: {} 頁", report.pages_crawled);
    println!("   └─ 頁面錯誤: {} 頁", report.page_errors);
    println!("   └─ 成功文章: {} 篇", report.articles_succeeded);
    println!("   └─ 重複移除: {} 篇", report.duplicates_removed);
    println!("   └─ 最終資料: {} 篇", report.final_count);
    println!("   └─ 執行時間: {elapsed:.2} 秒");
    if elapsed > 0.0 {
        let rate = report.final_count as f64 / elapsed;
        println!("   └─ 平均速度: {rate:.2} 筆/秒");
    }
    println!("\n📁 檔案已儲存:");
    println!("   └─ 主檔案: {}", output.main.display());
    println!("   └─ 最新檔案: {}", output.latest.display());
    if report.page_errors > 0 {
        println!("   └─ 錯誤記錄: {}/", report.errors_dir.display());
    }
    println!("{RULE}");
    println!("\n🎉 爬取完成！成功取得 {} 筆資料", report.final_count);
}

fn spawn_ctrl_c(handle: StopHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            handle.stop();
        }
    });
}

async fn execute(args: &Args, config: &CrawlerConfig) -> Result<CrawlReport> {
    let mut settings = CrawlSettings::from_config(config)?;
    if let Some(board) = &args.board {
        settings.board.clone_from(board);
    }
    let mode = resolve_mode(args)?;
    print_banner(&settings.board, mode);

    let (handle, signal) = stop_pair();
    spawn_ctrl_c(handle);

    let crawler = Crawler::new(settings)?.with_stop_signal(signal);
    let request = CrawlRequest {
        board: crawler.settings().board.clone(),
        start: args.start,
        mode,
    };
    Ok(crawler.crawl_board(&request).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let config = match CrawlerConfig::load(args.config.as_deref()) {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            let archive = ErrorArchive::new(CrawlerConfig::DEFAULT_ERRORS_DIR);
            report_fatal(&archive, &anyhow::Error::new(err));
            return ExitCode::FAILURE;
        }
    };
    let archive = ErrorArchive::new(config.errors_dir());

    match execute(&args, &config).await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_fatal(&archive, &err);
            ExitCode::FAILURE
        }
    }
}

/// Print a fatal error and append it to the dated main error log.
fn report_fatal(archive: &ErrorArchive, err: &anyhow::Error) {
    println!("❌ 爬取時發生錯誤：{err}");
    if let Err(log_err) = archive.log_main_error(err) {
        tracing::warn!("Failed to record fatal error: {log_err}");
    }
    println!("{RULE}");
}
