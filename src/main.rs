use std::fs;

use gglc::catalog::Catalog;
use gglc::circuit::Store;
use gglc::diag::Severity;
use gglc::naming::NameRegistry;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} snapshot.json root-circuit-id", args[0]);
        std::process::exit(2);
    }
    let snapshot = fs::read_to_string(&args[1])?;
    let store: Store = serde_json::from_str(&snapshot)?;

    let catalog = Catalog::new();
    let mut names = NameRegistry::new();
    let program = gglc::compile(&store, &args[2], &catalog, &mut names)?;
    log::info!(
        "compiled {} with {} module(s)",
        args[2],
        program.modules.len()
    );

    for module in &program.modules {
        println!("# --- {}.py ---", module.name);
        print!("{}", module.code);
        println!();
    }
    println!("# --- main.py ---");
    print!("{}", program.root);

    for diagnostic in &program.diagnostics {
        let tag = match diagnostic.severity() {
            Severity::Error => "error",
            Severity::Advice => "advice",
        };
        eprintln!("{tag}[{}]: {}", diagnostic.code(), diagnostic.message());
    }
    Ok(())
}
