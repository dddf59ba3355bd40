use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use sdl2::event::Event;

use chip8vm::{Config, Coordinator, Outputs, RunState};

use crate::display::Display;
use crate::keymap::{input, Input};

/// How often the window is refreshed and the coordinator sampled for a new frame
const REFRESH_RATE: u32 = 60;

pub fn run(rom: Vec<u8>, config: Config, scale: u32) -> Result<()> {
    let (coordinator, outputs) = Coordinator::new(config)?;

    // Get SDL2 context
    let sdl = sdl2::init().map_err(|e| anyhow!(e))?;
    let mut display = Display::new(&sdl, scale)?;
    let mut events = sdl.event_pump().map_err(|e| anyhow!(e))?;

    coordinator.start(rom);

    let refresh = Duration::from_secs(1) / REFRESH_RATE;
    let mut last_refresh = Instant::now();

    'event: loop {
        // Handle input
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. } => break 'event,
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => match input(key) {
                    Some(Input::Keypad(index)) => coordinator.set_key(index, true),
                    Some(Input::TogglePause) => match coordinator.state() {
                        RunState::Running => coordinator.pause(),
                        RunState::Paused => coordinator.resume(),
                        RunState::Initial => {}
                    },
                    Some(Input::Restart) => coordinator.restart(),
                    Some(Input::Quit) => break 'event,
                    None => continue,
                },
                Event::KeyUp {
                    keycode: Some(key), ..
                } => {
                    if let Some(Input::Keypad(index)) = input(key) {
                        coordinator.set_key(index, false);
                    }
                }
                _ => continue,
            };
        }

        coordinator.sample();
        drain(&outputs, &mut display)?;

        // Handle timing
        let elapsed = last_refresh.elapsed();
        if refresh > elapsed {
            std::thread::sleep(refresh - elapsed);
        }
        last_refresh = Instant::now();
    }

    Ok(())
}

/// Renders the newest published frame and reports everything else the coordinator sent
fn drain(outputs: &Outputs, display: &mut Display) -> Result<()> {
    if let Some(frame) = outputs.frames.try_iter().last() {
        display.render(&frame)?;
    }
    for _ in outputs.sounds.try_iter() {
        log::info!("beep");
    }
    for state in outputs.states.try_iter() {
        if state == RunState::Paused {
            log::info!("paused; press P to resume or Backspace to restart");
        }
    }
    Ok(())
}
