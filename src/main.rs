//! Moorage - FreeBSD jail topology modeler
//!
//! Validates host/jail network topologies described in a TOML manifest and
//! prints or exports the resolved model.

use moorage::cli::{Cli, Commands};
use moorage::error::Result;
use moorage::export::TopologyExport;
use moorage::manifest;
use moorage::system::Master;

use std::rc::Rc;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Completion { shell } => {
            Cli::generate_completion(shell);
            Ok(())
        }
        Commands::Check => {
            let master = manifest::load(&cli.config)?.build()?;
            let addresses = master.ip_pool().map(|pool| pool.len()).unwrap_or(0);
            println!(
                "{}: ok ({} jails, {} addresses)",
                master.name(),
                master.jails().len(),
                addresses
            );
            Ok(())
        }
        Commands::Show => {
            let master = manifest::load(&cli.config)?.build()?;
            print_topology(&master);
            Ok(())
        }
        Commands::Export { output } => {
            let master = manifest::load(&cli.config)?.build()?;
            let json = TopologyExport::from_master(&master).to_json()?;
            match output {
                Some(path) => std::fs::write(&path, json)?,
                None => println!("{}", json),
            }
            Ok(())
        }
    }
}

fn print_topology(master: &Rc<Master>) {
    println!("{} ({})", master.name(), master.hostname());
    for iface in [master.ext_if(), master.int_if(), master.lo_if()]
        .into_iter()
        .flatten()
    {
        let ips: Vec<String> = iface.ips().into_iter().collect();
        println!("  {}: {}", iface.name(), ips.join(", "));
    }
    println!("  jail root: {}", master.jail_root().display());
    for (name, jail) in master.jails() {
        let ip = jail
            .ip()
            .map(|ifaddr| ifaddr.to_string())
            .unwrap_or_else(|| "-".to_string());
        match jail.path() {
            Some(path) => println!("  jail {}: ip={} path={}", name, ip, path.display()),
            None => println!("  jail {}: ip={}", name, ip),
        }
    }
}
