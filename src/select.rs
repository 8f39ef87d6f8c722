//! Picking the compute device.  The rules don't depend on OpenCL, so
//! they live here where they can be exercised without a GPU.

use std::fmt;
use std::io::{BufRead, Write};

use error::{Error, Result};

/// What gets printed about each device before the choice is made.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSummary {
    /// Position in the platform's GPU list; this is what the user types.
    pub index: usize,
    /// Device name.
    pub name: String,
    /// Device type as the runtime reports it.
    pub kind: String,
    /// Vendor string.
    pub vendor: String,
    /// Parallel compute units.
    pub compute_units: u32,
    /// Global memory in bytes.
    pub global_memory: u64,
    /// Maximum clock frequency in MHz.
    pub max_clock: u32,
    /// Largest single allocation in bytes.
    pub max_allocation: u64,
    /// Local memory in bytes.
    pub local_memory: u64,
    /// Whether the device is available.
    pub available: bool,
}

impl fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Device #{}", self.index)?;
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Type: {}", self.kind)?;
        writeln!(f, "Vendor: {}", self.vendor)?;
        writeln!(f, "Max Compute Units: {}", self.compute_units)?;
        writeln!(f, "Global Memory: {} MByte", self.global_memory / (1024 * 1024))?;
        writeln!(f, "Max Clock Frequency: {}", self.max_clock)?;
        writeln!(
            f,
            "Max Allocateable Memory: {} MByte",
            self.max_allocation / (1024 * 1024)
        )?;
        writeln!(f, "Local Memory: {} KByte", self.local_memory / 1024)?;
        write!(f, "Available: {}", self.available)
    }
}

/// Decides which of `count` devices to use.  An explicit request wins;
/// a lone device is taken without asking; otherwise `prompt` is asked.
pub fn choose_device<F>(count: usize, requested: Option<usize>, prompt: F) -> Result<usize>
where
    F: FnOnce() -> Result<usize>,
{
    if count == 0 {
        return Err(Error::NoDevice);
    }
    let choice = match requested {
        Some(index) => index,
        None if count == 1 => {
            info!("Choosing the only GPU");
            0
        }
        None => prompt()?,
    };
    if choice >= count {
        return Err(Error::BadDeviceChoice(format!(
            "device {} requested but only {} available",
            choice, count
        )));
    }
    Ok(choice)
}

/// Asks for a device index on `output` and reads one line of `input`.
pub fn read_choice<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<usize> {
    write!(output, "Device choice: ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    let line = line.trim();
    line.parse::<usize>()
        .map_err(|_| Error::BadDeviceChoice(format!("{:?} is not a device index", line)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn never() -> Result<usize> {
        panic!("prompt should not be consulted")
    }

    #[test]
    fn no_devices_is_an_error() {
        match choose_device(0, None, never) {
            Err(Error::NoDevice) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn lone_device_is_taken() {
        assert_eq!(choose_device(1, None, never).unwrap(), 0);
    }

    #[test]
    fn request_wins_over_prompt() {
        assert_eq!(choose_device(3, Some(2), never).unwrap(), 2);
        assert!(choose_device(3, Some(3), never).is_err());
    }

    #[test]
    fn several_devices_prompt() {
        assert_eq!(choose_device(2, None, || Ok(1)).unwrap(), 1);
        assert!(choose_device(2, None, || Ok(5)).is_err());
    }

    #[test]
    fn reads_choice_from_a_line() {
        let mut prompt = Vec::new();
        let choice = read_choice(Cursor::new("  1 \n"), &mut prompt).unwrap();
        assert_eq!(choice, 1);
        assert_eq!(String::from_utf8(prompt).unwrap(), "Device choice: ");
    }

    #[test]
    fn garbage_choice_is_rejected() {
        match read_choice(Cursor::new("gpu please\n"), Vec::new()) {
            Err(Error::BadDeviceChoice(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert!(read_choice(Cursor::new("-1\n"), Vec::new()).is_err());
    }

    #[test]
    fn summary_prints_like_the_device_listing() {
        let summary = DeviceSummary {
            index: 0,
            name: "Tahiti".to_string(),
            kind: "GPU".to_string(),
            vendor: "AMD".to_string(),
            compute_units: 32,
            global_memory: 3 * 1024 * 1024 * 1024,
            max_clock: 1000,
            max_allocation: 768 * 1024 * 1024,
            local_memory: 32 * 1024,
            available: true,
        };
        let text = summary.to_string();
        assert!(text.starts_with("Device #0\nName: Tahiti\n"));
        assert!(text.contains("Global Memory: 3072 MByte"));
        assert!(text.contains("Max Allocateable Memory: 768 MByte"));
        assert!(text.contains("Local Memory: 32 KByte"));
        assert!(text.ends_with("Available: true"));
    }
}
