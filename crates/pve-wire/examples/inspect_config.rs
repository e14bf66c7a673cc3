//! Simple inspector for guest config dumps.
//!
//! Reads the JSON `data` object of a `GET /nodes/{node}/qemu/{vmid}/config`
//! response (or a file holding just that object) and prints the decoded
//! properties.

use std::fs;

use pve_wire::model::{Disk, NetworkInterface};
use pve_wire::{wire_map_from_json, FromWireMap, Mode, ToForm, VmConfig};

fn format_disk(slot: &str, disk: &Disk) -> String {
    let mut line = format!("{slot}: {}", disk.volume);
    if let Some(size) = disk.size {
        line.push_str(&format!(" ({size})"));
    }
    if disk.is_cdrom() {
        line.push_str(" [cdrom]");
    }
    if let Some(cache) = disk.cache.and_then(|c| c.token()) {
        line.push_str(&format!(" cache={cache}"));
    }
    line
}

fn format_nic(slot: &str, nic: &NetworkInterface) -> String {
    format!(
        "{slot}: {} {} on {}{}{}",
        nic.model.token().unwrap_or("?"),
        nic.macaddr.as_deref().unwrap_or("(no mac)"),
        nic.bridge.as_deref().unwrap_or("(no bridge)"),
        nic.tag.map(|t| format!(" vlan {t}")).unwrap_or_default(),
        if nic.firewall { " firewall" } else { "" },
    )
}

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());

    println!("Reading: {path}");

    let text = fs::read_to_string(&path).expect("Failed to read file");
    let mut json: serde_json::Value = serde_json::from_str(&text).expect("Failed to parse JSON");
    if let Some(data) = json.get_mut("data") {
        json = data.take();
    }
    let map = wire_map_from_json(json).expect("Expected a JSON object");
    println!("Properties: {}", map.len());

    let config = match VmConfig::from_wire_map(&map) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("[{}] {err}", err.kind().code());
            std::process::exit(1);
        }
    };

    println!("\n=== Guest ===");
    println!("Name: {}", config.name.as_deref().unwrap_or("(unnamed)"));
    println!("Start on boot: {}", config.onboot);

    println!("\n=== CPU ===");
    println!(
        "{} socket(s) x {} core(s) = {} vCPU",
        config.cpu.sockets,
        config.cpu.cores,
        config.cpu.max_vcpus()
    );
    if let Some(cpu) = &config.cpu.cpu {
        println!("Type: {}", cpu.cputype);
        for flag in &cpu.flags {
            println!("  {}{}", if flag.enabled { '+' } else { '-' }, flag.name);
        }
    }

    println!("\n=== Memory ===");
    println!("{} MiB", config.memory.memory);
    match config.memory.balloon {
        Some(0) => println!("Balloon: disabled"),
        Some(min) => println!("Balloon: {min} MiB minimum"),
        None => {}
    }

    println!("\n=== Network ({}) ===", config.nets.len());
    for (slot, nic) in &config.nets {
        println!("{}", format_nic(slot, nic));
    }

    println!("\n=== Disks ({}) ===", config.disks.len());
    for (slot, disk) in &config.disks {
        println!("{}", format_disk(slot, disk));
    }

    println!("\n=== Create form ===");
    match config.to_form(Mode::Create) {
        Ok(form) => {
            for (key, value) in form.into_pairs() {
                println!("{key}={value}");
            }
        }
        Err(err) => eprintln!("[{}] {err}", err.kind().code()),
    }
}
