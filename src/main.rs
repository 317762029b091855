//! LS-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `ls8-emu run <program>` - Run a .ls8 image or .asm source
//! - `ls8-emu asm <source>` - Assemble to a .ls8 image
//! - `ls8-emu disasm <image>` - Disassemble a .ls8 image

use clap::{Parser, Subcommand};
use std::io::Write;

#[derive(Parser)]
#[command(name = "ls8-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator of the LS-8 8-bit educational computer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .ls8 image or .asm file to execute
        program: String,
        /// Maximum number of instructions to execute (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Show a trace line before each instruction
        #[arg(short, long)]
        trace: bool,
        /// Dump the final CPU state as JSON
        #[arg(short, long)]
        dump_state: bool,
    },
    /// Assemble source to a .ls8 image
    Asm {
        /// Path to the source file
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a .ls8 image to readable text
    Disasm {
        /// Path to the image file
        image: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            program,
            max_cycles,
            trace,
            dump_state,
        } => {
            run_program(&program, max_cycles, trace, dump_state);
        }
        Commands::Asm { source, output } => {
            assemble_file(&source, output);
        }
        Commands::Disasm { image } => {
            disassemble_file(&image);
        }
    }
}

/// Load a program's bytes, assembling first if it is a .asm file.
fn load_program_bytes(path: &str) -> Vec<u8> {
    use ls8::{assemble, load_image};

    if path.ends_with(".asm") {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to read file: {}", e);
                std::process::exit(1);
            }
        };

        match assemble(&source) {
            Ok(bytes) => {
                println!("📝 Assembled {} bytes", bytes.len());
                bytes
            }
            Err(e) => {
                eprintln!("❌ Assembly error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match load_image(path) {
            Ok(image) => {
                println!("📂 Loaded {} bytes", image.len());
                image.bytes
            }
            Err(e) => {
                eprintln!("❌ Failed to load image: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_program(path: &str, max_cycles: u64, trace: bool, dump_state: bool) {
    use ls8::Cpu;

    println!("🔧 Running: {}", path);

    let bytes = load_program_bytes(path);
    if bytes.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }

    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load_program(&bytes) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("━━━ Execution ━━━");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    cpu.start();
    let mut cycles = 0u64;
    while cpu.is_running() && cycles < max_cycles {
        let pc = cpu.regs.pc;

        if trace {
            let _ = writeln!(out, "{}", cpu.trace());
        }

        match cpu.step(&mut out) {
            Ok(_) => cycles += 1,
            Err(e) => {
                eprintln!("❌ CPU error at PC={}: {}", pc, e);
                std::process::exit(1);
            }
        }
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", cycles);
    println!("State: {:?}", cpu.state);
    for (i, value) in cpu.regs.snapshot().iter().enumerate() {
        println!("R{}: {:3} (0x{:02X})", i, value, value);
    }

    if dump_state {
        match serde_json::to_string_pretty(&cpu) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ Failed to serialize CPU state: {}", e);
                std::process::exit(1);
            }
        }
    }

    if cycles >= max_cycles && cpu.is_running() {
        println!();
        println!(
            "⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.",
            max_cycles
        );
    }
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use ls8::asm::image::save_bytes;
    use ls8::assemble;

    let out_path = output.unwrap_or_else(|| source_path.replace(".asm", ".ls8"));

    println!("📝 Assembling: {} → {}", source_path, out_path);

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let bytes = match assemble(&source) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Assembled {} bytes", bytes.len());

    if let Err(e) = save_bytes(&out_path, &bytes) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(image_path: &str) {
    use ls8::{disassemble, load_image};

    println!("📖 Disassembling: {}", image_path);
    println!();

    let image = match load_image(image_path) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", disassemble(&image.bytes));
}
