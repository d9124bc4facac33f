//! Light devices the strobe can drive.

use std::fmt;
use std::sync::mpsc::Sender;

use log::{error, info};
use rppal::gpio::{Gpio, OutputPin};

use crate::error::DeviceError;
use crate::host::{DeviceProvider, HostEvent};

/// Anything that can be switched on and off by the blink worker.
///
/// Calls may fail; the worker treats every failure as "no visible flash this time".
pub trait LightDevice: Send + 'static {
    /// Whether a real flash is behind this device.
    fn is_available(&self) -> bool;

    fn turn_on(&mut self) -> Result<(), DeviceError>;

    fn turn_off(&mut self) -> Result<(), DeviceError>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FlashMode {
    Torch,
    Off,
}

impl fmt::Display for FlashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashMode::Torch => f.write_str("torch"),
            FlashMode::Off => f.write_str("off"),
        }
    }
}

/// 32-bit ARGB colour.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Color(pub u32);

impl Color {
    pub const BLUE: Color = Color(0xFF0000FF);
    pub const RED: Color = Color(0xFFFF0000);
    pub const WHITE: Color = Color(0xFFFFFFFF);
    pub const DARK: Color = Color(0xCC000000);

    /// CSS `rgba()` form; ARGB hex would be read as RGBA by a browser.
    pub fn css(&self) -> String {
        let [a, r, g, b] = self.0.to_be_bytes();
        format!("rgba({}, {}, {}, {:.2})", r, g, b, f64::from(a) / 255.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

pub const POLICE_COLORS: [Color; 3] = [Color::BLUE, Color::RED, Color::WHITE];

/// A flash LED on a GPIO output pin.
pub struct GpioLight {
    pin: OutputPin,
}

impl GpioLight {
    pub fn new(pin: OutputPin) -> Self {
        GpioLight { pin }
    }

    pub fn open(bcm_pin: u8) -> rppal::gpio::Result<Self> {
        let pin = Gpio::new()?.get(bcm_pin)?.into_output();
        Ok(GpioLight::new(pin))
    }
}

impl LightDevice for GpioLight {
    fn is_available(&self) -> bool {
        true
    }

    fn turn_on(&mut self) -> Result<(), DeviceError> {
        self.pin.set_high();
        Ok(())
    }

    fn turn_off(&mut self) -> Result<(), DeviceError> {
        self.pin.set_low();
        Ok(())
    }
}

/// Uses the screen as the light by painting police colours.
///
/// Painting is host state, so it is posted to the host loop rather than done here.
pub struct ScreenLight {
    host: Sender<HostEvent>,
    flashes: usize,
}

impl ScreenLight {
    pub fn new(host: Sender<HostEvent>) -> Self {
        ScreenLight { host, flashes: 0 }
    }

    fn paint(&self, color: Color) -> Result<(), DeviceError> {
        self.host
            .send(HostEvent::Paint(color))
            .map_err(|_| DeviceError::Unavailable)
    }
}

impl LightDevice for ScreenLight {
    fn is_available(&self) -> bool {
        false
    }

    fn turn_on(&mut self) -> Result<(), DeviceError> {
        let color = POLICE_COLORS[self.flashes % POLICE_COLORS.len()];
        self.flashes = self.flashes.wrapping_add(1);
        self.paint(color)
    }

    fn turn_off(&mut self) -> Result<(), DeviceError> {
        self.paint(Color::DARK)
    }
}

/// Screen light with an optional hardware flash alongside it.
pub struct Strobe<F = GpioLight> {
    screen: ScreenLight,
    flash: Option<F>,
}

impl<F: LightDevice> Strobe<F> {
    pub fn new(screen: ScreenLight, flash: Option<F>) -> Self {
        Strobe { screen, flash }
    }

    pub fn into_flash(self) -> Option<F> {
        self.flash
    }

    fn both(
        &mut self,
        op: impl Fn(&mut dyn LightDevice) -> Result<(), DeviceError>,
    ) -> Result<(), DeviceError> {
        let screen = op(&mut self.screen);
        let flash = match self.flash.as_mut() {
            Some(flash) => op(flash),
            None => Err(DeviceError::Unavailable),
        };
        screen.and(flash)
    }
}

impl<F: LightDevice> LightDevice for Strobe<F> {
    fn is_available(&self) -> bool {
        self.flash.as_ref().map_or(false, |flash| flash.is_available())
    }

    fn turn_on(&mut self) -> Result<(), DeviceError> {
        self.both(|device| device.turn_on())
    }

    fn turn_off(&mut self) -> Result<(), DeviceError> {
        self.both(|device| device.turn_off())
    }
}

/// Hands out a [`Strobe`] per session, with the GPIO flash when the pin can be opened.
pub struct GpioProvider {
    led_pin: Option<u8>,
    host: Sender<HostEvent>,
}

impl GpioProvider {
    pub fn new(led_pin: Option<u8>, host: Sender<HostEvent>) -> Self {
        GpioProvider { led_pin, host }
    }
}

impl DeviceProvider for GpioProvider {
    type Device = Strobe;

    fn acquire(&mut self) -> Option<Strobe> {
        let flash = self.led_pin.and_then(|pin| match GpioLight::open(pin) {
            Ok(flash) => Some(flash),
            Err(err) => {
                error!("Unable to set up GPIO flash on pin {}: {}", pin, err);
                None
            }
        });
        if flash.is_none() {
            info!("no flash, strobing with the screen only");
        }
        Some(Strobe::new(ScreenLight::new(self.host.clone()), flash))
    }

    fn release(&mut self, device: Strobe) {
        if let Some(mut flash) = device.into_flash() {
            let _ = flash.turn_off();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub enum Call {
        On,
        Off,
    }

    /// Records every call; fails `turn_on` with the given error while `failures` remain.
    #[derive(Clone, Default)]
    pub struct Recorder {
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub failures: Arc<Mutex<Vec<DeviceError>>>,
    }

    impl Recorder {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LightDevice for Recorder {
        fn is_available(&self) -> bool {
            true
        }

        fn turn_on(&mut self) -> Result<(), DeviceError> {
            self.calls.lock().unwrap().push(Call::On);
            match self.failures.lock().unwrap().pop() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn turn_off(&mut self) -> Result<(), DeviceError> {
            self.calls.lock().unwrap().push(Call::Off);
            Ok(())
        }
    }

    #[test]
    fn screen_cycles_police_colors() {
        let (tx, rx) = mpsc::channel();
        let mut screen = ScreenLight::new(tx);
        for _ in 0..4 {
            screen.turn_on().unwrap();
            screen.turn_off().unwrap();
        }
        let painted: Vec<Color> = rx
            .try_iter()
            .map(|event| match event {
                HostEvent::Paint(color) => color,
                _ => panic!("unexpected event"),
            })
            .collect();
        assert_eq!(
            painted,
            [
                Color::BLUE,
                Color::DARK,
                Color::RED,
                Color::DARK,
                Color::WHITE,
                Color::DARK,
                Color::BLUE,
                Color::DARK
            ]
        );
    }

    #[test]
    fn screen_without_host_is_unavailable() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut screen = ScreenLight::new(tx);
        assert_eq!(screen.turn_on(), Err(DeviceError::Unavailable));
    }

    #[test]
    fn strobe_without_flash_still_paints() {
        let (tx, rx) = mpsc::channel();
        let mut strobe: Strobe<Recorder> = Strobe::new(ScreenLight::new(tx), None);
        assert!(!strobe.is_available());
        assert_eq!(strobe.turn_on(), Err(DeviceError::Unavailable));
        assert!(matches!(rx.try_recv(), Ok(HostEvent::Paint(Color::BLUE))));
    }

    #[test]
    fn strobe_drives_flash() {
        let (tx, _rx) = mpsc::channel();
        let flash = Recorder::default();
        let mut strobe = Strobe::new(ScreenLight::new(tx), Some(flash.clone()));
        assert!(strobe.is_available());
        strobe.turn_on().unwrap();
        strobe.turn_off().unwrap();
        assert_eq!(flash.calls(), [Call::On, Call::Off]);
    }

    #[test]
    fn provider_without_pin_is_screen_only() {
        let (tx, rx) = mpsc::channel();
        let mut provider = GpioProvider::new(None, tx);
        let mut strobe = provider.acquire().expect("screen is always there");
        assert!(!strobe.is_available());
        assert_eq!(strobe.turn_on(), Err(DeviceError::Unavailable));
        assert!(matches!(rx.try_recv(), Ok(HostEvent::Paint(Color::BLUE))));
        provider.release(strobe);
    }

    #[test]
    fn color_display() {
        assert_eq!(Color::DARK.to_string(), "#CC000000");
        assert_eq!(Color::DARK.css(), "rgba(0, 0, 0, 0.80)");
        assert_eq!(Color::BLUE.css(), "rgba(0, 0, 255, 1.00)");
    }
}
