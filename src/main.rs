//! HELM — Autonomous Revenue Management Agent for Short-Term Rentals
//!
//! Entry point. Loads configuration, initialises structured logging,
//! and runs one pricing cycle over the demo portfolio: publish demand
//! signals, generate proposals, apply the configured review policy,
//! and sync approved changes with read-back verification.

use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use helm::channel::hostaway::HostawayClient;
use helm::channel::ChannelManager;
use helm::config::AppConfig;
use helm::engine::analyst::PricingAnalyst;
use helm::engine::executor::ChannelSyncExecutor;
use helm::engine::reviewer::GuardrailReviewer;
use helm::signals::EventSignalProvider;
use helm::stores::memory::{
    MemoryCalendarStore, MemoryEventSignalStore, MemoryListingRegistry, MemoryProposalStore,
};
use helm::stores::{EventSignalStore, ProposalStore};
use helm::storage;
use helm::types::{
    CalendarNight, CalendarStatus, DateRange, EventSignal, ImpactTier, Listing, ProposalStatus,
    ReviewDecision, RiskLevel,
};

const BANNER: &str = r#"
 _   _ _____ _     __  __
| | | | ____| |   |  \/  |
| |_| |  _| | |   | |\/| |
|  _  | |___| |___| |  | |
|_| |_|_____|_____|_|  |_|

  Revenue Management Agent for Short-Term Rentals
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        currency = %cfg.agent.currency,
        horizon_days = cfg.agent.proposal_horizon_days,
        channel_enabled = cfg.channel.enabled,
        "HELM starting up"
    );

    // -- Initialise components -------------------------------------------

    let channel: Arc<dyn ChannelManager> = if cfg.channel.enabled {
        let api_key = AppConfig::resolve_env(&cfg.channel.api_key_env)?;
        let client = match &cfg.channel.base_url {
            Some(url) => HostawayClient::with_base_url(api_key, url.clone())?,
            None => HostawayClient::new(api_key)?,
        };
        info!(channel = client.name(), "Channel manager connected");
        Arc::new(client)
    } else {
        warn!("Channel disabled — running local-only, no external sync");
        Arc::new(HostawayClient::new("unused".to_string())?)
    };

    let today = Utc::now().date_naive();
    let (listings, nights, events) = demo_portfolio(today, cfg.channel.enabled, &cfg.agent.currency);

    let registry = Arc::new(MemoryListingRegistry::with_listings(listings));
    let calendar = Arc::new(MemoryCalendarStore::with_nights(nights));
    let signal_store = Arc::new(MemoryEventSignalStore::new());
    let proposals = Arc::new(MemoryProposalStore::new());

    let analyst = PricingAnalyst::new(
        registry.clone(),
        calendar.clone(),
        proposals.clone(),
        EventSignalProvider::new(signal_store.clone()),
        cfg.pricing.clone(),
    )
    .with_occupancy_window(cfg.agent.occupancy_window_days);

    let reviewer = GuardrailReviewer::new(proposals.clone());
    let executor = ChannelSyncExecutor::new(
        proposals.clone(),
        registry,
        calendar,
        channel,
        cfg.sync.clone(),
    );

    // -- One cycle: signals → proposals → review → sync --------------------

    let version = signal_store.publish(events).await?;
    info!(version, "Demand signals published");

    let range = DateRange::new(
        today + Duration::days(1),
        today + Duration::days(cfg.agent.proposal_horizon_days as i64),
    );

    let portfolio = analyst.generate_portfolio(range).await?;

    let mut saved_ids = Vec::new();
    for (listing_id, result) in &portfolio {
        info!(listing_id, summary = %result.summary, "Listing analysed");
        saved_ids.extend(analyst.save_proposals(result).await?);
    }

    if saved_ids.is_empty() {
        info!(range = %range, "No pricing changes recommended. Cycle complete.");
        return Ok(());
    }

    // Review policy: low-risk proposals may auto-approve; everything
    // else waits for an operator.
    let approved_count = if cfg.review.auto_approve_low_risk {
        let mut low_risk = Vec::new();
        for &id in &saved_ids {
            if let Some(p) = proposals.get(id).await? {
                if p.risk_level == RiskLevel::Low {
                    low_risk.push(id);
                }
            }
        }
        reviewer.review_bulk(&low_risk, ReviewDecision::Approve).await?
    } else {
        0
    };
    let awaiting = saved_ids.len() - approved_count;
    if awaiting > 0 {
        info!(count = awaiting, "Proposals awaiting operator review");
    }

    let approved = proposals.list_by_status(ProposalStatus::Approved).await?;
    let approved_ids: Vec<i64> = approved.iter().map(|p| p.id).collect();

    let results = executor.execute_batch(&approved_ids).await;

    let audit_file = cfg.storage.audit_file.as_deref();
    for result in &results {
        storage::append_result(result, audit_file)?;
    }

    let verified = results.iter().filter(|r| r.success && r.verified).count();
    let unverified = results.iter().filter(|r| r.success && !r.verified).count();
    let failed = results.iter().filter(|r| !r.success).count();
    info!(
        proposed = saved_ids.len(),
        approved = approved_ids.len(),
        verified,
        unverified,
        failed,
        "Cycle complete"
    );

    Ok(())
}

/// Demo portfolio: three Dubai listings with a trailing calendar that
/// puts each in a different occupancy band, plus the headline events
/// for the season. External ids are only attached when the channel is
/// enabled, so a local run never attempts a real sync.
fn demo_portfolio(
    today: NaiveDate,
    channel_enabled: bool,
    currency: &str,
) -> (Vec<Listing>, Vec<CalendarNight>, Vec<EventSignal>) {
    let ext = |id: i64| channel_enabled.then_some(id);

    let listings = vec![
        Listing {
            id: 1,
            name: "Marina View 2BR".to_string(),
            base_price: 750.0,
            currency: currency.to_string(),
            external_id: ext(40221),
            floor: None,
            ceiling: None,
        },
        Listing {
            id: 2,
            name: "Downtown Studio".to_string(),
            base_price: 450.0,
            currency: currency.to_string(),
            external_id: ext(40222),
            floor: None,
            ceiling: None,
        },
        Listing {
            id: 3,
            name: "JBR Penthouse".to_string(),
            base_price: 1200.0,
            currency: currency.to_string(),
            external_id: ext(40223),
            floor: None,
            ceiling: None,
        },
    ];

    // Trailing 30 days: listing 1 runs hot (87%), listing 2 is slow
    // (40%), listing 3 sits mid-band (70%).
    let mut nights = Vec::new();
    for (listing_id, booked_of_30, price) in [(1, 26, 750.0), (2, 12, 450.0), (3, 21, 1200.0)] {
        for i in 1..=30 {
            nights.push(CalendarNight {
                listing_id,
                date: today - Duration::days(i),
                status: if i <= booked_of_30 {
                    CalendarStatus::Booked
                } else {
                    CalendarStatus::Available
                },
                current_price: price,
                min_stay: None,
                max_stay: None,
            });
        }
    }

    let events = vec![
        EventSignal {
            name: "Dubai Shopping Festival".to_string(),
            start_date: today + Duration::days(3),
            end_date: today + Duration::days(9),
            location: "Dubai (City-wide)".to_string(),
            expected_impact: ImpactTier::High,
            confidence: 95,
            description: Some("City-wide festival with significant tourist influx".to_string()),
        },
        EventSignal {
            name: "Dubai International Boat Show".to_string(),
            start_date: today + Duration::days(6),
            end_date: today + Duration::days(8),
            location: "Dubai Harbour".to_string(),
            expected_impact: ImpactTier::Medium,
            confidence: 80,
            description: None,
        },
    ];

    (listings, nights, events)
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("helm=info"));

    let json_logging = std::env::var("HELM_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
