//! Scripted scenarios for the command-line driver

use crate::Scenario;
use anyhow::{Context, Result};
use log::{debug, info};
use winsync::testing::{harness, Harness, HostCommand, WindowSpec};
use winsync::{HostEvent, QuitReason, Rect, SyncConfig};

pub fn run(scenario: Scenario, config: SyncConfig) -> Result<Vec<HostCommand>> {
    let h = harness(config);
    match scenario {
        Scenario::Stacking => stacking(&h)?,
        Scenario::Feedback => feedback(&h)?,
        Scenario::Quit => quit(&h),
    }
    Ok(h.host.commands())
}

pub fn print(commands: &[HostCommand], json: bool) -> Result<()> {
    for command in commands {
        if json {
            println!("{}", serde_json::to_string(command).context("Failed to serialize host command")?);
        } else {
            println!("{:?}", command);
        }
    }
    Ok(())
}

fn host_of(h: &Harness, window: winsync::WindowId) -> Result<winsync::HostWindowId> {
    h.host_of(window)
        .with_context(|| format!("{} has no host window", window))
}

/// Back window shown, middle one left hidden, front one shown last: the
/// front window is placed relative to the back one.
fn stacking(h: &Harness) -> Result<()> {
    let back = h.open(WindowSpec::new(Rect::new(100, 100, 600, 500)).title("back"));
    let hidden = h.client.create_window(WindowSpec::new(Rect::new(150, 150, 650, 550)).title("hidden"));
    let front = h.client.create_window(WindowSpec::new(Rect::new(200, 200, 700, 600)).title("front"));
    h.client.show(front);

    info!(
        "host stack front to back: {:?} (hidden window {} not shown)",
        h.host.front_to_back(),
        hidden
    );
    debug!("back {} is {}", back, host_of(h, back)?);
    Ok(())
}

/// A host-initiated move is applied without being echoed, a resize the
/// host refuses is pulled back into the client.
fn feedback(h: &Harness) -> Result<()> {
    let window = h.open(WindowSpec::new(Rect::new(100, 100, 600, 500)).title("feedback"));
    let host = host_of(h, window)?;
    let frame = h.host.window(host).map(|w| w.frame).context("host window vanished")?;

    h.event(HostEvent::FrameChanged {
        window: host,
        frame: frame.offset(50, 30),
        fullscreen: false,
        in_resize: false,
        skip_size_move_loop: true,
    });
    info!("after host move: {:?}", h.sync.snapshot(window).map(|r| r.window_rect));

    h.host.set_max_frame_size(800, 600);
    h.client.move_to(window, Rect::new(0, 0, 1600, 1000));
    info!("after refused resize: {:?}", h.sync.snapshot(window).map(|r| r.window_rect));
    Ok(())
}

/// Three windows, the middle one vetoes: the host hears "no" once and every
/// window still gets its end-session message.
fn quit(h: &Harness) {
    let windows: Vec<_> = (0..3)
        .map(|i| h.open(WindowSpec::new(Rect::from_origin_size(100 + 40 * i, 100 + 40 * i, 400, 300))))
        .collect();
    h.client.set_session_answer(windows[1], false);

    h.sync.begin_quit(QuitReason::Menu);

    for (window, message) in h.client.session_messages() {
        info!("{} <- {:?}", window, message);
    }
    info!("exited: {}", h.client.exited());
}
