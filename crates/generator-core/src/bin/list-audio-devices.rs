use sweepgen_generator_core::{pick_output_device, CpalDeviceLister, DeviceLister};
use sweepgen_shared_protocol::DEFAULT_SAMPLE_RATE_HZ;

fn main() {
    println!("SweepGen Audio Device Listing\n");

    match CpalDeviceLister.list_output_devices() {
        Ok(devices) => {
            if devices.is_empty() {
                println!("No output devices found.");
                return;
            }
            for device in &devices {
                println!(
                    "{}{}",
                    device.name,
                    if device.is_default { "  [default]" } else { "" }
                );
                println!("  Channels:     {}", device.channels);
                println!(
                    "  Sample Rates: {} - {} Hz",
                    device.min_sample_rate_hz, device.max_sample_rate_hz
                );
                println!(
                    "  Sweep Ready:  {}",
                    device.supports_rate(DEFAULT_SAMPLE_RATE_HZ as u32)
                );
            }
            if let Some(picked) = pick_output_device(&devices, None, DEFAULT_SAMPLE_RATE_HZ as u32)
            {
                println!("\nWould use: {}", picked.name);
            }
        }
        Err(e) => {
            eprintln!("Error listing output devices: {}", e);
            std::process::exit(1);
        }
    }
}
