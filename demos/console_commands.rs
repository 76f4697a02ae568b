//! Console Commands Example
//!
//! Several driving-game consoles share one connection to the track controller.
//! Each console sends a short sequence of commands (grab a train, set its speed,
//! release it again). A sequence must reach the controller without commands
//! from other consoles in between, so every console locks the link for the
//! whole sequence, including the simulated round-trip time of each command.
//!
//! Consoles are served in the order they asked for the link.

use std::rc::Rc;

use railmutex::sync::Mutex;
use railmutex::time::{self, Duration, Time};

#[derive(Debug, Clone)]
enum Command {
    GrabTrain { train: &'static str },
    SetSpeed { train: &'static str, speed: i32 },
    ReleaseTrain { train: &'static str },
}

#[derive(Default)]
struct ControllerLink {
    sent: Vec<(Time, &'static str, Command)>,
}

impl ControllerLink {
    const ROUND_TRIP: Duration = Duration::from_millis(120);

    async fn send(&mut self, console: &'static str, command: Command) {
        time::sleep(Self::ROUND_TRIP).await;
        println!("[{}] {console}: {command:?}", time::now());
        self.sent.push((time::now(), console, command));
    }
}

async fn drive(
    link: Rc<Mutex<ControllerLink>>,
    console: &'static str,
    train: &'static str,
    speed: i32,
) {
    let mut link = link.lock().await;

    link.send(console, Command::GrabTrain { train }).await;
    link.send(console, Command::SetSpeed { train, speed }).await;
    link.send(console, Command::SetSpeed { train, speed: 0 }).await;
    link.send(console, Command::ReleaseTrain { train }).await;
}

#[railmutex::main]
async fn main() {
    env_logger::init();

    let link = Rc::new(Mutex::with_name(ControllerLink::default(), "controller"));

    railmutex::spawn(drive(link.clone(), "console-a", "cargo_db", 40));
    railmutex::spawn(drive(link.clone(), "console-b", "regional_odeg", -25));
    railmutex::spawn(drive(link.clone(), "console-c", "cargo_green", 60));

    time::sleep(Duration::from_micros(1)).await;
    let link = link.lock().await;

    // Each console's four commands arrive back to back
    for chunk in link.sent.chunks(4) {
        let console = chunk[0].1;
        assert!(chunk.iter().all(|(_, sender, _)| *sender == console));
    }

    println!(
        "{} commands delivered by {}",
        link.sent.len(),
        time::now()
    );
}
