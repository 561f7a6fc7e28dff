//! sim-replay CLI - Inspect archives and dry-run reconstructions.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use sim_replay::{
    archive,
    replay::{PartState, Reconstructor, SceneLog},
    schema::ReplayConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 3 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let archive_path = PathBuf::from(&args[2]);
    match args[1].as_str() {
        "info" => info(&archive_path),
        "replay" => replay(&archive_path, args.get(3).map(PathBuf::from)),
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <info|replay> <archive.simrec> [config.json]", program);
    eprintln!();
    eprintln!("Inspect a recorded simulation archive or dry-run its reconstruction.");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  info    Print the parts stored in an archive");
    eprintln!("  replay  Reconstruct into an in-memory scene and report the result");
    eprintln!();
    eprintln!("Example replay configuration is printed with --example.");
}

fn info(path: &Path) {
    let decoded = archive::load_lenient(path).unwrap_or_else(|e| {
        eprintln!("Error reading archive: {}", e);
        std::process::exit(1);
    });

    println!("Archive: {}", path.display());
    println!("=========");
    println!("Version: {}", decoded.version);
    println!("Parts: {}", decoded.archive.len());
    println!("Frames: {}", decoded.archive.frame_count());
    println!();

    for (name, part) in decoded.archive.parts() {
        let scale = part
            .descriptor
            .mesh_scale
            .map(|s| format!("[{}, {}, {}]", s[0], s[1], s[2]))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}: {} ({}), scale {}, {} frames",
            name,
            part.descriptor.mesh_path,
            part.descriptor.mesh_format(),
            scale,
            part.samples.len()
        );
    }

    for skipped in &decoded.skipped {
        println!("  {}: unsupported part type {:?}", skipped.name, skipped.tag);
    }
}

fn replay(path: &Path, config_path: Option<PathBuf>) {
    let config = match config_path {
        Some(config_path) => {
            let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
                eprintln!("Error reading config file: {}", e);
                std::process::exit(1);
            });
            serde_json::from_str(&config_str).unwrap_or_else(|e| {
                eprintln!("Error parsing config: {}", e);
                std::process::exit(1);
            })
        }
        None => ReplayConfig::default(),
    };

    let reconstructor = Reconstructor::new(config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("Replaying {}", path.display());
    println!(
        "skip_frames: {}, max_frames: {}",
        config.skip_frames, config.max_frames
    );
    println!();

    let start = Instant::now();
    let mut host = SceneLog::new();
    let report = reconstructor
        .reconstruct_file(path, &mut host)
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    for outcome in &report.parts {
        match outcome.state {
            PartState::Done => println!(
                "  {}: {} keyframes (last host frame {}){}",
                outcome.name,
                outcome.keyframes,
                outcome
                    .last_host_frame
                    .map_or_else(|| "-".to_string(), |f| f.to_string()),
                if outcome.truncated { ", truncated" } else { "" }
            ),
            _ => println!(
                "  {}: skipped ({})",
                outcome.name,
                outcome
                    .skip_reason
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), |r| r.to_string())
            ),
        }
    }

    println!();
    println!("{}", report);
    println!("Time: {:.3}s", start.elapsed().as_secs_f32());
}

fn print_example_config() {
    let config = ReplayConfig::default();

    println!("Example replay configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error encoding config: {}", e),
    }
}
