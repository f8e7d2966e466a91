// Copyright (C) 2024 - 2025 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

#![deny(elided_lifetimes_in_paths)]

mod config;
mod kernel;
mod logger;

use std::{io::stdout, path::PathBuf, process::exit};

use anyhow::bail;
use clap::Subcommand;
use colored::Colorize;
use genasm::{AsmWriter, RegisterClass};
use log::LevelFilter;
use strum::IntoEnumIterator;

use self::{
    config::{ClassSetting, ConfigRoot},
    kernel::{MixingKernel, MIN_REGISTERS},
    logger::Logger,
};

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,

    /// Configuration file, `genasm.toml` in the working directory by default
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    pub fn parse_args() -> Self {
        use clap::Parser;
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate the mixing kernel and print its assembly
    Kernel {
        #[arg(long, value_enum)]
        class: Option<ClassSetting>,

        /// Only allocate this many registers of the class
        #[arg(long)]
        registers: Option<usize>,

        #[arg(long)]
        inputs: Option<usize>,

        #[arg(long)]
        rounds: Option<usize>,
    },

    /// List the vector register classes
    Classes,
}

fn main() {
    let args = Args::parse_args();

    if let Err(e) = run(args) {
        eprintln!("{}: {}", "fout".red().bold(), format!("{e:#}").bold());
        exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = ConfigRoot::load(args.config.as_deref())?;

    let level = if args.verbose || config.log.debug {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn
    };
    Logger::initialize(level);

    match args.command {
        Commands::Kernel { class, registers, inputs, rounds } => {
            let settings = config.kernel;

            let class = class.unwrap_or(settings.register_class);
            let mut register_set = class.register_set();
            if let Some(registers) = registers.or(settings.registers) {
                register_set = register_set.limited_to(registers);
            }

            if register_set.count() < MIN_REGISTERS {
                bail!("de kernel heeft minstens {MIN_REGISTERS} registers nodig, maar er zijn er maar {}", register_set.count());
            }

            let kernel = MixingKernel {
                register_set,
                inputs: inputs.unwrap_or(settings.inputs),
                rounds: rounds.unwrap_or(settings.rounds),
            };

            generate(kernel)
        }

        Commands::Classes => {
            for class in RegisterClass::iter() {
                println!("{:<4} {:>2} registers, {:>3} bits", class.as_ref().bold(), class.count(), class.width_bits());
            }
            Ok(())
        }
    }
}

fn generate(kernel: MixingKernel) -> anyhow::Result<()> {
    let mut writer = AsmWriter::new(stdout().lock());
    writer.write_label("mix_kernel")?;

    let mut alloc = kernel.new_allocator(writer);
    kernel.generate(&mut alloc)?;

    let stats = alloc.snapshot();
    let spill_area = alloc.spill_area_size();

    let mut writer = alloc.into_emitter();
    writer.flush()?;

    eprintln!(
        "{} {} instructions, {} spills, {} bytes of stack",
        "klaar:".green().bold(),
        writer.instruction_count(),
        stats.spills,
        spill_area,
    );

    if stats.tracked_values != 0 {
        bail!("{} waarde(n) zijn gelekt", stats.tracked_values);
    }

    Ok(())
}
