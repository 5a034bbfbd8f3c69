//! UART: a single-slot, blocking producer/consumer serial port.
//!
//! The only concurrent producer in the system is a background thread reading
//! host stdin. Its contract, per the protocol this core commits to: one byte
//! of buffer, a condition variable the producer waits on while the slot is
//! full, a mutex serializing every register access with the reader thread,
//! and an atomic take-once interrupt flag the hart polls rather than blocks on.
//!
//! The device-facing `Uart` is an ordinary, uniquely-owned value (so it sits
//! as a plain field on the bus like any other device); the state the reader
//! thread touches lives behind an inner `Arc` it shares.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use tracing::{info, warn};

use crate::common::constants::{UART_BASE, UART_SIZE};
use crate::common::error::Trap;
use crate::soc::traits::Device;

const REG_RHR: u64 = 0;
const REG_THR: u64 = 0;
const REG_LCR: u64 = 3;
const REG_LSR: u64 = 5;

const LSR_RX_READY: u8 = 0x01;
const LSR_TX_EMPTY: u8 = 0x20;

struct Slot {
    byte: u8,
    full: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    not_full: Condvar,
    lcr: Mutex<u8>,
    interrupting: AtomicBool,
}

impl Shared {
    fn run_reader(&self) {
        let mut byte = [0u8; 1];
        loop {
            match io::stdin().read(&mut byte) {
                Ok(0) | Err(_) => return,
                Ok(_) => {
                    let mut slot = self.slot.lock().unwrap();
                    while slot.full {
                        slot = self.not_full.wait(slot).unwrap();
                    }
                    slot.byte = byte[0];
                    slot.full = true;
                    self.interrupting.store(true, Ordering::SeqCst);
                }
            }
        }
    }
}

/// A 16550-flavored serial port reduced to the registers this core uses.
pub struct Uart {
    shared: Arc<Shared>,
    to_stderr: bool,
}

impl fmt::Debug for Uart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uart").field("to_stderr", &self.to_stderr).finish()
    }
}

impl Uart {
    /// Creates a UART and spawns its host-stdin reader thread.
    ///
    /// `to_stderr` routes THR writes to stderr instead of stdout, for test
    /// runs that want stdout left clean for program output.
    #[must_use]
    pub fn new(to_stderr: bool) -> Self {
        info!(base = format!("{UART_BASE:#x}"), "UART attached");
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot { byte: 0, full: false }),
            not_full: Condvar::new(),
            lcr: Mutex::new(0),
            interrupting: AtomicBool::new(false),
        });

        let reader = Arc::clone(&shared);
        thread::spawn(move || reader.run_reader());

        Self { shared, to_stderr }
    }

    /// Atomically reads and clears the take-once interrupt flag.
    pub fn is_interrupting(&self) -> bool {
        self.shared.interrupting.swap(false, Ordering::SeqCst)
    }
}

impl Device for Uart {
    fn name(&self) -> &str {
        "UART0"
    }

    fn address_range(&self) -> (u64, u64) {
        (UART_BASE, UART_SIZE)
    }

    fn load(&mut self, offset: u64, size: u32) -> Result<u64, Trap> {
        let fault_addr = UART_BASE + offset;
        if size != 8 {
            return Err(Trap::LoadAccessFault(fault_addr));
        }
        let value = match offset {
            REG_RHR => {
                let mut slot = self.shared.slot.lock().unwrap();
                let byte = slot.byte;
                slot.full = false;
                self.shared.not_full.notify_one();
                byte
            }
            REG_LCR => *self.shared.lcr.lock().unwrap(),
            REG_LSR => {
                let slot = self.shared.slot.lock().unwrap();
                let mut lsr = LSR_TX_EMPTY;
                if slot.full {
                    lsr |= LSR_RX_READY;
                }
                lsr
            }
            _ => 0,
        };
        Ok(u64::from(value))
    }

    fn store(&mut self, offset: u64, size: u32, value: u64) -> Result<(), Trap> {
        let fault_addr = UART_BASE + offset;
        if size != 8 {
            return Err(Trap::StoreAmoAccessFault(fault_addr));
        }
        let byte = value as u8;
        match offset {
            REG_THR => {
                let result = if self.to_stderr {
                    let mut stderr = io::stderr();
                    stderr.write_all(&[byte]).and_then(|()| stderr.flush())
                } else {
                    let mut stdout = io::stdout();
                    stdout.write_all(&[byte]).and_then(|()| stdout.flush())
                };
                if let Err(e) = result {
                    warn!(error = %e, "UART THR write failed");
                }
            }
            REG_LCR => *self.shared.lcr.lock().unwrap() = byte,
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lsr_reports_tx_empty_with_no_pending_input() {
        let mut uart = Uart::new(true);
        assert_eq!(
            uart.load(REG_LSR, 8).unwrap() & u64::from(LSR_TX_EMPTY),
            u64::from(LSR_TX_EMPTY)
        );
    }

    #[test]
    fn non_8_bit_access_faults() {
        let mut uart = Uart::new(true);
        assert!(matches!(
            uart.load(REG_LSR, 32),
            Err(Trap::LoadAccessFault(_))
        ));
    }

    #[test]
    fn lcr_round_trips() {
        let mut uart = Uart::new(true);
        uart.store(REG_LCR, 8, 3).unwrap();
        assert_eq!(uart.load(REG_LCR, 8).unwrap(), 3);
    }
}
