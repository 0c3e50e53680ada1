//! clickhouse-http-ping: dial a server over HTTP, then ping it or run a query.
//!
//! Usage:
//!   clickhouse-http-ping ping <host:port>           Dial, ping, print the server time zone
//!   clickhouse-http-ping query <host:port> <sql>    Print result rows as tab-separated text

use anyhow::{bail, Context};
use clickhouse_http::{ColumnType, HttpConnection, Options, QueryContext, Rows};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "ping" => cmd_ping(&args[2..]).await,
        "query" => cmd_query(&args[2..]).await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"clickhouse-http-ping: ClickHouse HTTP transport probe

USAGE:
    clickhouse-http-ping <COMMAND> [ARGS]

COMMANDS:
    ping <host:port>            Dial, ping, print the server time zone
    query <host:port> <sql>     Print result rows as tab-separated text
    help                        Show this help message

ENVIRONMENT:
    CLICKHOUSE_HTTP_SCHEME                  http (default) or https
    CLICKHOUSE_HTTP_DIAL_TIMEOUT_MS         TCP connect timeout
    CLICKHOUSE_HTTP_CONN_MAX_LIFETIME_SECS  Keep-alive / idle lifetime
    CLICKHOUSE_HTTP_READ_TIMEOUT_SECS       Response header timeout
    RUST_LOG                                Log filter (default: warn)"#
    );
}

async fn dial(addr: &str) -> anyhow::Result<(QueryContext, HttpConnection)> {
    let ctx = QueryContext::new();
    let conn = HttpConnection::open(&ctx, addr, 0, &Options::from_env())
        .await
        .with_context(|| format!("failed to dial {addr}"))?;
    Ok((ctx, conn))
}

async fn cmd_ping(args: &[String]) -> anyhow::Result<()> {
    let Some(addr) = args.first() else {
        bail!("ping requires <host:port>");
    };
    let (ctx, mut conn) = dial(addr).await?;
    conn.ping(&ctx).await.context("ping failed")?;
    let tz = conn
        .server_timezone()
        .map(|tz| tz.name().to_string())
        .unwrap_or_else(|| "(unknown)".to_string());
    println!("ok {addr} timezone={tz}");
    conn.close()?;
    Ok(())
}

async fn cmd_query(args: &[String]) -> anyhow::Result<()> {
    let (Some(addr), Some(sql)) = (args.first(), args.get(1)) else {
        bail!("query requires <host:port> <sql>");
    };
    let (ctx, mut conn) = dial(addr).await?;
    {
        let mut rows = conn.query(&ctx, None, sql).await?;
        println!("{}", rows.columns().join("\t"));
        while rows.next().await? {
            let line = (0..rows.columns().len())
                .map(|idx| render(&rows, idx))
                .collect::<anyhow::Result<Vec<_>>>()?;
            println!("{}", line.join("\t"));
        }
    }
    conn.close()?;
    Ok(())
}

fn render(rows: &Rows<'_>, idx: usize) -> anyhow::Result<String> {
    let value = match &rows.column_types()[idx] {
        ColumnType::String => rows.get_str(idx)?.to_string(),
        ColumnType::UInt8 | ColumnType::UInt16 | ColumnType::UInt32 | ColumnType::UInt64 => {
            rows.get_u64(idx)?.to_string()
        }
        ColumnType::Int8 | ColumnType::Int16 | ColumnType::Int32 | ColumnType::Int64 => {
            rows.get_i64(idx)?.to_string()
        }
        ColumnType::Float32 | ColumnType::Float64 => rows.get_f64(idx)?.to_string(),
        ColumnType::Bool => rows.get_bool(idx)?.to_string(),
        ColumnType::DateTime(_) => rows.get_datetime(idx)?.to_rfc3339(),
    };
    Ok(value)
}
