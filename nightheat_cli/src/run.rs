//! Subcommand implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use nightheat_config::{Config, DeviceBackend, DeviceCfg};
use nightheat_core::{
    Command, ControllerCfg, CycleRunner, CycleTemplate, Evaluation, RunReport, Setpoint,
    ThermoError, evaluate, parse_timezone,
};
use nightheat_device::{SimulatedAuth, SimulatedBed, TomlProfileStore};
use nightheat_traits::{
    BedDevice, Clock, CredentialRefresher, ProfileStore, SystemClock, ThermalProfile,
};
use serde_json::json;

use crate::cli::Commands;
use crate::error_fmt::CliError;

pub async fn dispatch(cmd: Commands, cfg: &Config, json: bool) -> eyre::Result<()> {
    match cmd {
        Commands::Run { at } => cmd_run(cfg, at, json).await,
        Commands::Watch {
            interval_secs,
            max_runs,
        } => cmd_watch(cfg, interval_secs, max_runs, json).await,
        Commands::Plan {
            bed,
            wake,
            tz,
            at,
            initial,
            mid,
            final_level,
        } => {
            let profile = ThermalProfile {
                user_id: "plan".into(),
                device_user_id: "plan".into(),
                bed_time: bed,
                wake_time: wake,
                timezone: tz,
                initial_level: initial,
                mid_level: mid,
                final_level,
            };
            cmd_plan(cfg, &profile, at.unwrap_or_else(Utc::now), json)
        }
        Commands::Health => cmd_health(cfg, json).await,
    }
}

type Backends = (Arc<dyn CredentialRefresher>, Arc<dyn BedDevice>);

fn backends(d: &DeviceCfg) -> eyre::Result<Backends> {
    match d.backend {
        DeviceBackend::Simulated => {
            let lifetime = i64::try_from(d.token_lifetime_secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .ok_or_else(|| CliError::Config("device.token_lifetime_secs is too large".into()))?;
            let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
            let auth: Arc<dyn CredentialRefresher> = Arc::new(SimulatedAuth::new(clock, lifetime));
            let device: Arc<dyn BedDevice> = Arc::new(SimulatedBed::new());
            Ok((auth, device))
        }
        #[cfg(feature = "http")]
        DeviceBackend::Http => {
            use nightheat_device::{VendorClient, VendorClientCfg};
            let client = Arc::new(VendorClient::new(VendorClientCfg {
                api_base_url: d.api_base_url.clone().unwrap_or_default(),
                auth_base_url: d.auth_base_url.clone().unwrap_or_default(),
                client_id: d.client_id.clone().unwrap_or_default(),
                client_secret: d.client_secret.clone().unwrap_or_default(),
                request_timeout: Duration::from_millis(d.request_timeout_ms),
            })?);
            let auth: Arc<dyn CredentialRefresher> = client.clone();
            let device: Arc<dyn BedDevice> = client;
            Ok((auth, device))
        }
        #[cfg(not(feature = "http"))]
        DeviceBackend::Http => Err(CliError::Config(
            "device.backend = \"http\" requires a build with the `http` feature".into(),
        )
        .into()),
    }
}

pub fn build_runner(cfg: &Config) -> eyre::Result<CycleRunner> {
    let store: Arc<dyn ProfileStore> = Arc::new(TomlProfileStore::new(&cfg.store.profiles_path));
    let (auth, device) = backends(&cfg.device)?;
    let runner = CycleRunner::builder()
        .with_store(store)
        .with_auth(auth)
        .with_device(device)
        .with_config(ControllerCfg::from(cfg))
        .try_build()?;
    Ok(runner)
}

async fn cmd_run(cfg: &Config, at: Option<DateTime<Utc>>, json: bool) -> eyre::Result<()> {
    let runner = build_runner(cfg)?;
    let report = runner.run_cycle(at).await?;
    print_report(&report, json)
}

async fn cmd_watch(
    cfg: &Config,
    interval_secs: Option<u64>,
    max_runs: Option<u64>,
    json: bool,
) -> eyre::Result<()> {
    let runner = build_runner(cfg)?;
    let interval = Duration::from_secs(interval_secs.unwrap_or(cfg.runner.watch_interval_secs).max(1));

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))?;
    }

    tracing::info!(interval_secs = interval.as_secs(), ?max_runs, "watch start");
    let mut runs: u64 = 0;
    loop {
        // A failed fetch ends this run only; the next tick tries again.
        match runner.run_cycle(None).await {
            Ok(report) => print_report(&report, json)?,
            Err(e) => tracing::error!(error = %e, "run failed"),
        }
        runs += 1;
        if max_runs.is_some_and(|m| runs >= m) {
            break;
        }

        let mut waited = Duration::ZERO;
        while waited < interval && !stop.load(Ordering::Relaxed) {
            let step = (interval - waited).min(Duration::from_secs(1));
            tokio::time::sleep(step).await;
            waited += step;
        }
        if stop.load(Ordering::Relaxed) {
            tracing::info!("interrupted");
            break;
        }
    }
    tracing::info!(runs, "watch stop");
    Ok(())
}

fn cmd_plan(
    cfg: &Config,
    profile: &ThermalProfile,
    at: DateTime<Utc>,
    json: bool,
) -> eyre::Result<()> {
    let eval = evaluate(profile, at, &ControllerCfg::from(cfg))?;
    if json {
        println!("{}", plan_json(&eval, at));
    } else {
        print!("{}", plan_text(&eval, at));
    }
    Ok(())
}

async fn cmd_health(cfg: &Config, json: bool) -> eyre::Result<()> {
    let store = TomlProfileStore::new(&cfg.store.profiles_path);
    let records = store
        .load()
        .await
        .map_err(|e| ThermoError::Persistence(e.to_string()))?;
    let policy = ControllerCfg::from(cfg).cycle;

    let problems: Vec<String> = records
        .iter()
        .filter_map(|rec| {
            let p = &rec.profile;
            parse_timezone(&p.timezone)
                .and_then(|tz| CycleTemplate::parse(tz, &p.bed_time, &p.wake_time, policy))
                .err()
                .map(|e| format!("{}: {e}", p.user_id))
        })
        .collect();

    if json {
        println!(
            "{}",
            json!({
                "status": if problems.is_empty() { "ok" } else { "error" },
                "profiles": records.len(),
                "problems": problems,
            })
        );
    } else if problems.is_empty() {
        println!("ok: {} profiles", records.len());
    } else {
        for p in &problems {
            println!("problem: {p}");
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CliError::Profiles(format!("{} of {} profiles", problems.len(), records.len())).into())
    }
}

fn print_report(report: &RunReport, json: bool) -> eyre::Result<()> {
    if json {
        let mut v = serde_json::to_value(report)?;
        v["ok"] = json!(report.succeeded());
        v["failed"] = json!(report.failed());
        println!("{v}");
        return Ok(());
    }
    for o in &report.outcomes {
        match &o.error {
            None => println!(
                "{}: stage={} setpoint={} commands=[{}]",
                o.user_id,
                o.stage.map_or("-", |s| s.as_str()),
                o.setpoint.map_or_else(|| "-".to_string(), describe_setpoint),
                describe_commands(&o.commands),
            ),
            Some(e) => println!("{}: error: {e}", o.user_id),
        }
    }
    println!(
        "{} profiles: {} ok, {} failed{}",
        report.outcomes.len(),
        report.succeeded(),
        report.failed(),
        if report.dry_run { " (dry run)" } else { "" }
    );
    Ok(())
}

fn describe_setpoint(s: Setpoint) -> String {
    match s {
        Setpoint::Level(l) => format!("level {l}"),
        Setpoint::Hold => "hold".into(),
        Setpoint::PowerOff => "power off".into(),
    }
}

fn describe_commands(cmds: &[Command]) -> String {
    cmds.iter()
        .map(|c| match c {
            Command::PowerOn => "power_on".to_string(),
            Command::SetLevel(l) => format!("set_level({l})"),
            Command::PowerOff => "power_off".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn plan_text(eval: &Evaluation, at: DateTime<Utc>) -> String {
    let c = &eval.cycle;
    let mut out = format!(
        "reference   {}\ntimezone    {}\npre-heat    {}\nbed         {}\nmid         {}\nfinal       {}\n",
        at.to_rfc3339(),
        c.template().timezone(),
        c.pre_heat_start().to_rfc3339(),
        c.bed_time().to_rfc3339(),
        c.mid_stage_start().to_rfc3339(),
        c.final_stage_start().to_rfc3339(),
    );
    if let Some(w) = c.warming_start() {
        out.push_str(&format!("warming     {}\n", w.to_rfc3339()));
    }
    out.push_str(&format!(
        "wake        {}\nstage       {}\nsetpoint    {}\n",
        c.wake_time().to_rfc3339(),
        eval.stage,
        describe_setpoint(eval.setpoint),
    ));
    out
}

fn plan_json(eval: &Evaluation, at: DateTime<Utc>) -> serde_json::Value {
    let c = &eval.cycle;
    json!({
        "reference": at.to_rfc3339(),
        "timezone": c.template().timezone().name(),
        "anchor_date": c.anchor_date().to_string(),
        "pre_heat_start": c.pre_heat_start().to_rfc3339(),
        "bed_time": c.bed_time().to_rfc3339(),
        "mid_stage_start": c.mid_stage_start().to_rfc3339(),
        "final_stage_start": c.final_stage_start().to_rfc3339(),
        "warming_start": c.warming_start().map(|w| w.to_rfc3339()),
        "wake_time": c.wake_time().to_rfc3339(),
        "stage": eval.stage,
        "setpoint": eval.setpoint,
        "collapsed": c.collapsed_stages(),
    })
}
