use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, RwLock};
use std::time::Duration;
use std::{env, io, process, thread};

use log::info;
use syslog::Facility;

use walk_bright::config::Config;
use walk_bright::host::{HostEvent, Status, WalkBright};
use walk_bright::light::GpioProvider;
use walk_bright::{http, term_on_err};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> Result<(), io::Error> {
    let config_path = env::args_os().nth(1).map(PathBuf::from);
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Unable to load config: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = syslog::init(Facility::LOG_DAEMON, config.log_level, Some("walk-bright")) {
        eprintln!("Unable to connect to syslog, logging disabled: {}", err);
    }

    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&term))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term))?;
    let quick = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&quick))?;

    let (tx, rx) = mpsc::channel();
    let status = Arc::new(RwLock::new(Status::default()));
    let provider = GpioProvider::new(config.led_pin, tx.clone());
    let mut host = WalkBright::new(&config, provider, Arc::clone(&status));
    let mut threads = Vec::new();

    // Signal thread
    // SIGUSR1 is the quick launch button: toggle the strobe without going through HTTP
    {
        let term = Arc::clone(&term);
        let tx = tx.clone();
        let thread = thread::spawn(move || {
            while !term.load(Ordering::Relaxed) {
                if quick.swap(false, Ordering::SeqCst) {
                    term_on_err!(tx.send(HostEvent::QuickLaunch), &term);
                }
                thread::sleep(POLL_INTERVAL);
            }
            // Wake the host loop now rather than at its next timeout
            let _ = tx.send(HostEvent::Shutdown);
            eprintln!("signal thread exiting");
        });
        threads.push(thread);
    }

    // Start HTTP server
    let server = match http::Server::new(config.listen.as_str()) {
        Ok(server) => Arc::new(server),
        Err(err) => {
            eprintln!("Unable to start http server on {}: {}", config.listen, err);
            process::exit(1);
        }
    };
    eprintln!("http server running on {}", config.listen);

    // Handle HTTP requests
    {
        let status = Arc::clone(&status);
        let server = Arc::clone(&server);
        let tx = tx.clone();
        let thread = thread::spawn(move || {
            server.handle_requests(status, tx);
            eprintln!("server thread exiting");
        });
        threads.push(thread);
    }

    // Come up in the foreground, like opening the app
    info!(
        "walk-bright starting: on for {}ms, gaps {}",
        config.on_duration.as_millis(),
        config.pattern
    );
    let _ = tx.send(HostEvent::Foreground);
    drop(tx);

    // The host loop owns the light and runs until a signal or shutdown event
    host.run(rx, &term);
    term.store(true, Ordering::SeqCst);
    server.shutdown();

    for thread in threads {
        let _ = thread.join();
    }

    Ok(())
}
