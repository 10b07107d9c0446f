use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use torque_afx::{
    BuildEnv, EffectWrapper, EffectWrapperConfig, ExecContext, FxServices, PathConfig, PathRegistry,
    RecordingAdapter, StaticConstraints,
};
use torque_common::{RandomSource, SplitMix64};
use torque_curve::AnimCurve;
use torque_decal::{DecalFlags, DecalInstance, DecalStore, DecalStoreConfig};

#[derive(Parser)]
#[command(name = "torque-cli", about = "CLI tool for decal indexing and effect playback")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Scatter clustered decals and report how they are indexed
    Decals {
        /// Number of clusters
        #[arg(short, long, default_value = "2")]
        clusters: usize,
        /// Decals per cluster
        #[arg(short, long, default_value = "100")]
        per_cluster: usize,
        /// Distance between cluster centers
        #[arg(short, long, default_value = "200")]
        spread: f32,
        /// RNG seed for decal placement
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Write the decals to a data file and read them back
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Run an effect config for a number of ticks
    Effect {
        /// Effect config (JSON)
        config: PathBuf,
        /// Named paths for path-conform modifiers (JSON object of path configs)
        #[arg(long)]
        paths: Option<PathBuf>,
        /// Seconds per tick
        #[arg(long, default_value = "0.1")]
        dt: f32,
        /// Number of ticks to run
        #[arg(long, default_value = "20")]
        ticks: u32,
        /// Call stop() at this tick
        #[arg(long)]
        stop_at: Option<u32>,
    },
    /// Sample a keyframe curve
    Curve {
        /// Keys as `time:value` pairs separated by commas
        #[arg(short, long)]
        keys: String,
        /// Number of samples across the key range
        #[arg(short, long, default_value = "11")]
        samples: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("torque-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", torque_common::crate_info());
            println!("curve: {}", torque_curve::crate_info());
            println!("decal: {}", torque_decal::crate_info());
            println!("afx: {}", torque_afx::crate_info());
        }
        Commands::Decals {
            clusters,
            per_cluster,
            spread,
            seed,
            save,
        } => run_decals(clusters, per_cluster, spread, seed, save)?,
        Commands::Effect {
            config,
            paths,
            dt,
            ticks,
            stop_at,
        } => run_effect(&config, paths.as_deref(), dt, ticks, stop_at)?,
        Commands::Curve { keys, samples } => run_curve(&keys, samples)?,
    }

    Ok(())
}

fn run_decals(
    clusters: usize,
    per_cluster: usize,
    spread: f32,
    seed: u64,
    save: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Decals: {clusters} clusters x {per_cluster}, spread={spread}, seed={seed}");
    let mut rng = SplitMix64::new(seed);
    let mut store = DecalStore::new(DecalStoreConfig::default());
    for c in 0..clusters {
        let center = Vec3::new(c as f32 * spread, 0.0, 0.0);
        for _ in 0..per_cluster {
            let jitter = Vec3::new(rng.range(-5.0, 5.0), rng.range(-5.0, 5.0), 0.0);
            let decal = DecalInstance::at(center + jitter, rng.range(0.25, 1.0))
                .with_data_index((c % 2) as u32)
                .with_flags(DecalFlags::SAVE);
            store.add_decal(decal);
        }
    }
    println!("Indexed: decals={}, spheres={}", store.len(), store.sphere_count());
    for (i, s) in store.spheres().iter().enumerate() {
        let ws = s.world_sphere();
        println!(
            "  sphere {i}: items={}, center={:?}, radius={:.2}",
            s.len(),
            ws.center,
            ws.radius
        );
    }

    if let Some(path) = save {
        let datablocks = vec!["bulletHole".to_string(), "scorch".to_string()];
        let written = store
            .save_to_path(&datablocks, &path)
            .with_context(|| format!("writing {}", path.display()))?;
        let (loaded, _) = DecalStore::load_from_path(&path, DecalStoreConfig::default())
            .with_context(|| format!("reading {}", path.display()))?;
        println!(
            "Saved {written} decals to {}; reloaded decals={}, spheres={}",
            path.display(),
            loaded.len(),
            loaded.sphere_count()
        );
    }
    Ok(())
}

fn run_effect(
    config_path: &Path,
    paths_path: Option<&Path>,
    dt: f32,
    ticks: u32,
    stop_at: Option<u32>,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config = EffectWrapperConfig::from_json(&text)
        .with_context(|| format!("parsing {}", config_path.display()))?;

    let registry = match paths_path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading {}", p.display()))?;
            let configs: BTreeMap<String, PathConfig> = serde_json::from_str(&text)?;
            PathRegistry::from_configs(&configs)?
        }
        None => PathRegistry::new(),
    };

    let adapter = RecordingAdapter::new();
    let log = adapter.log();
    let mut effect = EffectWrapper::new(config, &BuildEnv { paths: &registry }, Box::new(adapter))?;
    println!(
        "Effect '{}': modifiers={:?}, dt={dt}, ticks={ticks}",
        effect.name(),
        effect.pipeline().names()
    );

    let constraints = StaticConstraints::new();
    let mut rng = SplitMix64::new(1);
    let mut svc = FxServices {
        constraints: &constraints,
        collision: &(),
        rng: &mut rng,
    };

    if !effect.start(0.0, ExecContext::default(), &mut svc) {
        println!("Effect did not start");
    }
    for tick in 0..ticks {
        if stop_at == Some(tick) {
            effect.stop();
            println!("tick {tick:>3}: stop requested");
        }
        let alive = effect.update(dt, &mut svc);
        let out = effect.output();
        println!(
            "tick {tick:>3}: t={:.2} state={:?} scope={} fade={:.3} vis={:.3} pos={:?} scale={:?}",
            effect.elapsed(),
            effect.state(),
            out.in_scope,
            out.fade,
            out.vis,
            out.pos,
            out.scale
        );
        if !alive || effect.is_done() {
            break;
        }
    }
    let was_stopped = effect.is_stopped();
    effect.cleanup(was_stopped, &constraints);

    let log = log.borrow();
    println!(
        "Done: done={}, updates={}, stops={}, finishes={}",
        effect.is_done(),
        log.updates,
        log.stops,
        log.finishes
    );
    Ok(())
}

fn parse_keys(text: &str) -> anyhow::Result<Vec<[f32; 2]>> {
    text.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|pair| {
            let (t, v) = pair
                .split_once(':')
                .with_context(|| format!("key `{pair}` is not time:value"))?;
            let t: f32 = t
                .trim()
                .parse()
                .with_context(|| format!("bad time in `{pair}`"))?;
            let v: f32 = v
                .trim()
                .parse()
                .with_context(|| format!("bad value in `{pair}`"))?;
            Ok([t, v])
        })
        .collect()
}

fn run_curve(keys: &str, samples: usize) -> anyhow::Result<()> {
    let pairs = parse_keys(keys)?;
    let curve = AnimCurve::from_pairs(&pairs)?;
    if !curve.is_usable() {
        anyhow::bail!("curve has no keys");
    }
    let (start, end) = (curve.start_time(), curve.end_time());
    println!("Curve: keys={}, range=[{start}, {end}]", curve.len());
    let steps = samples.max(2) - 1;
    for i in 0..=steps {
        let t = start + (end - start) * i as f32 / steps as f32;
        println!("  t={t:>8.3}  v={:>10.4}", curve.evaluate(t));
    }
    Ok(())
}
