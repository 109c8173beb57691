//! Standalone A-share sync collector CLI.

use ashare_collector::{modules, SyncContext};
use ashare_core::{init_logging, AppConfig, ApplyMode, LogConfig};
use ashare_data::Database;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ashare-collector")]
#[command(about = "A-share market data sync collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로
    #[arg(long, default_value = "config/default.toml")]
    config: String,

    /// 로그 레벨 (지정하면 설정 파일 값을 덮어씀)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// DB 마이그레이션 실행
    Migrate,

    /// 종목 기본 정보 동기화 (Tushare)
    SyncStockBasic,

    /// 개념 섹터 동기화 (AKShare)
    SyncConcepts {
        /// 전체를 하나의 트랜잭션으로 반영
        #[arg(long)]
        atomic: bool,
    },

    /// 일봉 이력 동기화
    SyncDailyHistory {
        /// 특정 종목만 (쉼표로 구분, 예: "000001.SZ,600000.SH")
        #[arg(long, value_delimiter = ',')]
        ts_codes: Vec<String>,
    },

    /// 일봉 증분 동기화
    SyncDailyIncrement {
        /// 거래일 (YYYY-MM-DD, 기본값: 어제)
        #[arg(long)]
        trade_date: Option<NaiveDate>,
    },

    /// 일봉 동기화 실패 재시도
    RetryFailures {
        /// 재시도 상한 (기본값: 설정의 default_max_retries)
        #[arg(long)]
        max_retries: Option<i32>,
    },

    /// 재무 지표 전체 동기화
    SyncFinanceFull {
        #[arg(long, value_delimiter = ',')]
        ts_codes: Vec<String>,
    },

    /// 재무 지표 증분 동기화
    SyncFinanceIncrement {
        #[arg(long, value_delimiter = ',')]
        ts_codes: Vec<String>,
    },

    /// 단일 종목 재무 지표 동기화
    SyncFinanceByStock {
        /// 종목 코드 (예: 600000.SH)
        ts_code: String,
    },

    /// 전체 워크플로우 실행
    RunAll,

    /// 데몬 모드: 주기적으로 전체 워크플로우 실행
    Daemon,
}

fn codes(ts_codes: &[String]) -> Option<&[String]> {
    (!ts_codes.is_empty()).then_some(ts_codes)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)?;

    let mut log_config = LogConfig::from_settings(&config.logging);
    if let Some(level) = &cli.log_level {
        log_config = LogConfig::new(level.clone()).with_format(log_config.format);
    }
    init_logging(log_config).map_err(|e| e.to_string())?;

    tracing::info!("A-share Data Collector 시작");

    let db = Database::connect(&config.database).await?;

    if let Commands::Migrate = cli.command {
        db.migrate().await?;
        db.into_pool().close().await;
        return Ok(());
    }

    let pool = db.into_pool();
    let ctx = SyncContext::from_config(&config, pool.clone())?;

    match cli.command {
        Commands::Migrate => {}
        Commands::SyncStockBasic => {
            modules::sync_stock_basic(&ctx).await?;
        }
        Commands::SyncConcepts { atomic } => {
            let mode = if atomic {
                ApplyMode::AtomicBatch
            } else {
                ApplyMode::PerUnit
            };
            modules::sync_concepts(&ctx, mode).await?;
        }
        Commands::SyncDailyHistory { ts_codes } => {
            modules::sync_daily_history(&ctx, codes(&ts_codes)).await?;
        }
        Commands::SyncDailyIncrement { trade_date } => {
            modules::sync_daily_increment(&ctx, trade_date).await?;
        }
        Commands::RetryFailures { max_retries } => {
            let max_retries = max_retries.unwrap_or(config.sync.default_max_retries);
            modules::retry_daily_failures(&ctx, max_retries).await?;
        }
        Commands::SyncFinanceFull { ts_codes } => {
            modules::sync_finance_full(&ctx, codes(&ts_codes)).await?;
        }
        Commands::SyncFinanceIncrement { ts_codes } => {
            modules::sync_finance_increment(&ctx, codes(&ts_codes)).await?;
        }
        Commands::SyncFinanceByStock { ts_code } => {
            modules::sync_finance_by_stock(&ctx, &ts_code).await?;
        }
        Commands::RunAll => {
            let summary = modules::run_workflow(&ctx).await;
            if !summary.failed.is_empty() {
                tracing::warn!(failed = ?summary.failed, "일부 단계 실패");
            }
        }
        Commands::Daemon => {
            tracing::info!(
                interval_minutes = config.sync.daemon_interval_minutes,
                "=== 데몬 모드 시작 ==="
            );

            let mut interval = tokio::time::interval(config.sync.daemon_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        modules::run_workflow(&ctx).await;
                        tracing::info!(
                            "=== 워크플로우 완료, 다음 실행: {}분 후 ===",
                            config.sync.daemon_interval_minutes
                        );
                    }
                }
            }
        }
    }

    pool.close().await;
    tracing::info!("A-share Data Collector 종료");

    Ok(())
}
