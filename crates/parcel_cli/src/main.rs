//! Parcel store smoke binary.
//!
//! Usage: `parcel_cli [DB_PATH [LOG_DIR]]`. Without a path an in-memory
//! database is used; logs go to `LOG_DIR` when given.

use parcel_core::db::{open_db, open_db_in_memory};
use parcel_core::{
    describe_parcel, init_logging, ClientId, LoggingConfig, ParcelService, ParcelStore,
};
use std::error::Error;
use std::process::ExitCode;

const DEMO_CLIENT: ClientId = 1000;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("parcel_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    println!("parcel_core version={}", parcel_core::core_version());

    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    if let Some(log_dir) = args.next() {
        init_logging(&LoggingConfig::new(log_dir))?;
    }

    let conn = match db_path {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let service = ParcelService::new(ParcelStore::try_new(&conn)?);

    let parcel = service.register(DEMO_CLIENT, "Pskov, Voennaya st. 15-3")?;
    println!("registered {}", describe_parcel(&parcel));

    service.change_address(parcel.number, "Saratov, Verkhnyaya st. 4")?;
    let status = service.next_status(parcel.number)?;
    println!("parcel #{} moved to {status}", parcel.number);

    // Address is frozen once the parcel has been sent.
    service.change_address(parcel.number, "ignored")?;
    service.next_status(parcel.number)?;

    for stored in service.client_parcels(DEMO_CLIENT)? {
        println!("{}", describe_parcel(&stored));
    }
    for entry in service.client_history(DEMO_CLIENT)? {
        println!(
            "history #{} parcel={} status={} address={} changed_at={}",
            entry.id, entry.parcel_number, entry.status, entry.address, entry.changed_at
        );
    }

    Ok(())
}
