use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::bail;

use spn_map::ac::Ac;
use spn_map::dot::DotConfig;
use spn_map::method::{MapConfig, Method};
use spn_map::query::Query;
use spn_map::random::RandomSpn;
use spn_map::spn::Spn;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Arithmetic circuit to load.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["spn", "random"])]
    ac: Option<PathBuf>,

    /// Sum-product network to load.
    #[arg(long, value_name = "FILE", conflicts_with = "random")]
    spn: Option<PathBuf>,

    /// Generate a random binary network over this many variables.
    #[arg(long, value_name = "INT")]
    random: Option<usize>,

    /// Query, e.g. `01*??` (`?` free, `*` summed out). Repeatable.
    #[arg(long, value_name = "STR")]
    query: Vec<Query>,

    /// File with one query per line.
    #[arg(long, value_name = "FILE")]
    queries: Option<PathBuf>,

    /// Method: BT, NG, NB, AMAP, PRB, BS, KBT, MP, FC, ORDERING, STAGE.
    #[arg(long, value_name = "NAME", default_value = "FC")]
    method: Method,

    #[arg(long, value_name = "INT", default_value = "10")]
    beam_width: usize,

    /// Number of induced trees for KBT.
    #[arg(short, value_name = "INT", default_value = "100")]
    k: usize,

    /// Number of draws for PRB.
    #[arg(long, value_name = "INT", default_value = "1000")]
    samples: usize,

    /// Time budget per query, in seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    #[arg(long, value_name = "INT", default_value = "0")]
    seed: u64,

    /// Write the network in Graphviz format.
    #[arg(long, value_name = "FILE")]
    dot: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: simplelog::LevelFilter,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let spn = if let Some(path) = &args.ac {
        let ac = Ac::load(path)?;
        println!("{}", ac.info());
        Spn::from_ac(&ac)
    } else if let Some(path) = &args.spn {
        Spn::load(path)?
    } else if let Some(vars) = args.random {
        if vars == 0 {
            bail!("--random needs at least one variable");
        }
        RandomSpn::new(vars).seed(args.seed).build()
    } else {
        bail!("one of --ac, --spn or --random is required");
    };
    println!("{}", spn.info());

    if let Some(path) = &args.dot {
        std::fs::write(path, spn.to_dot(&DotConfig::default())?)?;
        println!("Wrote {}", path.display());
    }

    let mut queries = args.query.clone();
    if let Some(path) = &args.queries {
        for line in std::fs::read_to_string(path)?.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            queries.push(line.parse()?);
        }
    }
    if queries.is_empty() {
        queries.push(Query::free(spn.num_vars()));
    }

    let mut config = MapConfig::new()
        .with_seed(args.seed)
        .with_beam_width(args.beam_width)
        .with_k(args.k)
        .with_samples(args.samples);
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::try_from_secs_f64(secs)?);
    }

    println!("Solving {} queries with {}...", queries.len(), args.method);
    let solutions = spn.solve_queries(&queries, args.method, &config)?;
    for (query, sol) in queries.iter().zip(&solutions) {
        let assignment: String = sol
            .assignment
            .iter()
            .map(|s| match s {
                Some(s) => s.to_string(),
                None => "*".to_string(),
            })
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{} -> score={:.6} x=[{}] in {:.3} s",
            query,
            sol.candidate.score,
            assignment,
            sol.elapsed.as_secs_f64()
        );
    }

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
