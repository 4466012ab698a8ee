//! Dynamic reordering demo.
//!
//! Builds `x0·y0 + x1·y1 + ... + x(k-1)·y(k-1)` under the order that puts
//! every `x` above every `y`, which is exponential in `k`, then reorders it.
//!
//! Run with:
//! ```bash
//! cargo run --example reorder -- 8 --method sift
//! ```

use clap::Parser;

use dd_rs::config::Config;
use dd_rs::manager::Manager;
use dd_rs::mtr::GroupFlags;
use dd_rs::reorder::ReorderMethod;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of `x·y` products.
    #[arg(value_name = "INT", default_value = "8")]
    k: usize,

    /// Reordering method.
    #[clap(long, value_name = "METHOD", default_value = "sift")]
    method: ReorderMethod,

    /// Reorder automatically while building instead of once at the end.
    #[clap(long)]
    auto: bool,

    /// Keep x0, x1 and x2 together as a group.
    #[clap(long)]
    group: bool,

    /// Unique subtable slots per level.
    #[clap(long, value_name = "INT", default_value = "256")]
    slots: usize,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let k = args.k;
    let config = Config {
        unique_slots: args.slots,
        auto_method: args.auto.then_some(args.method),
        first_reordering: 256,
        ..Config::default()
    };
    let mut m = Manager::with_config(2 * k, config);
    if args.group && k >= 3 {
        m.make_tree_node(0, 3, GroupFlags::DEFAULT)?;
    }

    let mut f = m.zero();
    m.ref_node(f);
    for i in 0..k {
        let x = m.ith_var(i as u32)?;
        let y = m.ith_var((i + k) as u32)?;
        let xy = m.and(x, y)?;
        m.ref_node(xy);
        let g = m.or(f, xy)?;
        m.ref_node(g);
        m.recursive_deref(xy);
        m.recursive_deref(f);
        f = g;
    }
    println!("built f: {} nodes, order {:?}", m.dag_size(f), m.order());
    println!("automatic reorderings so far: {}", m.read_reorderings());

    let stats = m.reduce_heap_with_stats(args.method, 0)?;
    println!(
        "{}: {} -> {} nodes ({:.1}% reduction), {} swaps in {:.3} s",
        args.method,
        stats.initial_size,
        stats.final_size,
        stats.reduction_percent(),
        stats.swaps,
        stats.elapsed.as_secs_f64()
    );
    println!("f: {} nodes, order {:?}", m.dag_size(f), m.order());
    if let Some(tree) = m.tree() {
        println!("groups: {}", tree.print_grouped_order(&m.order()));
    }

    m.debug_check()?;
    m.recursive_deref(f);
    println!("leaked references: {}", m.check_zero_ref());
    m.quit();

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
