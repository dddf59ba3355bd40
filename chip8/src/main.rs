use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use chip8vm::{disassemble, Config, CLOCK_SPEED};

mod display;
mod keymap;
mod library;
mod run;

use library::Library;

#[derive(Parser)]
#[command(name = "chip8")]
#[command(about = "Chip-8 emulator")]
#[command(version)]
struct Cli {
    /// ROM file to run, or a game name when used with --library
    rom: Option<String>,

    /// Instructions executed per second
    #[arg(short, long, default_value_t = CLOCK_SPEED)]
    rate: u32,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Size of each Chip-8 pixel on screen
    #[arg(long, default_value_t = 10)]
    scale: u32,

    /// JSON game catalog; lists it when no game is named
    #[arg(long)]
    library: Option<PathBuf>,

    /// Print the ROM's disassembly instead of running it
    #[arg(long)]
    disassemble: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let rom = match (&cli.library, &cli.rom) {
        (Some(path), None) => {
            let library = Library::open(path)?;
            for game in library.games() {
                println!("{:<24} {}", game.name, library.rom_path(game).display());
            }
            return Ok(());
        }
        (Some(path), Some(name)) => {
            let library = Library::open(path)?;
            let game = library
                .find(name)
                .with_context(|| format!("no game named {:?} in {}", name, path.display()))?;
            log::info!("loading {}", game.name);
            library.load(game)?
        }
        (None, Some(path)) => fs::read(path).with_context(|| format!("failed to read ROM {}", path))?,
        (None, None) => bail!("expected a ROM file, or --library to list a game catalog"),
    };

    if cli.disassemble {
        for line in disassemble(&rom) {
            println!("{}", line);
        }
        return Ok(());
    }

    let mut config = Config::default().with_cycle_rate(cli.rate);
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    run::run(rom, config, cli.scale)
}
