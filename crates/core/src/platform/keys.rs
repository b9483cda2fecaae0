use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

use crate::config::Key;

use super::KeyPoller;

/// Polls key state through GetAsyncKeyState. Works regardless of
/// which window has focus.
pub struct WinKeyPoller;

impl KeyPoller for WinKeyPoller {
    fn is_down(&self, key: Key) -> bool {
        let state = unsafe { GetAsyncKeyState(vk(key) as i32) };
        (state as u16 & 0x8000) != 0
    }
}

fn vk(key: Key) -> u16 {
    match key {
        Key::Shift => 0x10,
        Key::Ctrl => 0x11,
        Key::Alt => 0x12,
        Key::End => 0x23,
        Key::Home => 0x24,
        Key::F1 => 0x70,
        Key::F2 => 0x71,
        Key::F3 => 0x72,
        Key::F4 => 0x73,
        Key::F5 => 0x74,
        Key::F6 => 0x75,
        Key::F7 => 0x76,
        Key::F8 => 0x77,
        Key::F9 => 0x78,
        Key::F10 => 0x79,
        Key::F11 => 0x7A,
        Key::F12 => 0x7B,
        Key::Mouse4 => 0x05,
        Key::Mouse5 => 0x06,
    }
}
