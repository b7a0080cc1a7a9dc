/// 256-color ANSI palette entries used for API traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Green,
    LightGreen,
    Blue,
    LightBlue,
}

impl Color {
    pub fn code(self) -> u8 {
        match self {
            Color::Green => 28,
            Color::LightGreen => 40,
            Color::Blue => 27,
            Color::LightBlue => 39,
        }
    }

    pub fn paint(self, msg: &str) -> String {
        format!("\x1b[38;5;{}m{}\x1b[00m", self.code(), msg)
    }
}

/// Colors for inbound (remote to GUI) and outbound (GUI to remote) traffic.
/// Model sessions are green, controller sessions blue.
pub fn log_colors(is_model: bool, no_color: bool) -> (Option<Color>, Option<Color>) {
    if no_color {
        return (None, None);
    }
    if is_model { (Some(Color::LightGreen), Some(Color::Green)) } else { (Some(Color::LightBlue), Some(Color::Blue)) }
}
