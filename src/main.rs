use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use prettytable::{Table, row};
use vmem::{BufferManager, ElementValue, FileError, FileResult, VmConfig};

#[derive(Parser)]
#[command(name = "vmem", about = "Demand-paged virtual integer array")]
struct Cli {
    /// JSON config file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of resident page slots
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Logical array capacity in elements
    #[arg(long)]
    array_size: Option<usize>,

    /// Elements per page (must match the existing store)
    #[arg(long)]
    elements_per_page: Option<usize>,

    /// Backing store file
    #[arg(long)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read, write, then read again a few elements
    Demo,
    /// Print the value of each element
    Get { indices: Vec<usize> },
    /// Assign a value to an element
    Set { index: usize, value: i32 },
}

impl Cli {
    fn vm_config(&self) -> FileResult<VmConfig> {
        let mut config = match &self.config {
            Some(path) => VmConfig::load(path)?,
            None => VmConfig::default(),
        };
        if let Some(buffer_size) = self.buffer_size {
            config = config.with_buffer_size(buffer_size);
        }
        if let Some(array_size) = self.array_size {
            config = config.with_array_size(array_size);
        }
        if let Some(elements_per_page) = self.elements_per_page {
            config = config.with_elements_per_page(elements_per_page);
        }
        if let Some(path) = &self.path {
            config = config.with_path(path);
        }
        Ok(config)
    }
}

/// Render a read as a table cell; out-of-range indices get their own row
fn value_cell(read: FileResult<ElementValue>) -> FileResult<String> {
    match read {
        Ok(ElementValue::Found(v)) => Ok(v.to_string()),
        Ok(ElementValue::NotWritten) => Ok("not written".to_string()),
        Err(FileError::OutOfRange { .. }) => Ok("out of range".to_string()),
        Err(e) => Err(e),
    }
}

fn print_values(bm: &mut BufferManager, indices: &[usize]) -> FileResult<()> {
    let mut table = Table::new();
    table.add_row(row!["Index", "Value", "Page", "Slot"]);

    for &index in indices {
        let value = value_cell(bm.get(index))?;
        let slot = bm
            .find_page(index)?
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        table.add_row(row![index, value, bm.page_index_of(index), slot]);
    }

    table.printstd();
    Ok(())
}

fn run(cli: Cli) -> FileResult<()> {
    let config = cli.vm_config()?;

    BufferManager::scoped(&config, |bm| match cli.command.unwrap_or(Command::Demo) {
        Command::Demo => {
            let indices = [0, 200, 640];
            println!("Store: {}", bm.path().display());
            println!("Current values:");
            print_values(bm, &indices)?;

            println!("Writing values...");
            for (&index, value) in indices.iter().zip([3, 5, 10]) {
                bm.set(index, Some(value))?;
            }

            println!("New values:");
            print_values(bm, &indices)?;

            let stats = bm.stats();
            println!(
                "hits={} misses={} evictions={} write-backs={}",
                stats.hits, stats.misses, stats.evictions, stats.write_backs
            );
            Ok(())
        }
        Command::Get { indices } => print_values(bm, &indices),
        Command::Set { index, value } => bm.set(index, Some(value)),
    })
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
