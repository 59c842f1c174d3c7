use anyhow::Result;
use pet_core::{AppClock, ChatSession, Config, SubmitOutcome};
use tracing::info;

pub const RESET_COMMAND: &str = "/reset";

pub struct App {
    // Core state
    pub should_quit: bool,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat log view
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Header info
    pub model_name: String,
    pub key_source: Option<&'static str>,

    pub session: ChatSession,
    pub clock: AppClock,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let session = ChatSession::from_config(config)?;

        Ok(Self {
            should_quit: false,
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            model_name: config.model.clone(),
            key_source: config.key_source(),
            session,
            clock: AppClock::new(),
        })
    }

    /// Once per frame: collect finished requests and advance expression timers.
    pub fn on_tick(&mut self) {
        let before = self.session.log().len();
        self.session.poll(self.clock.now());
        if self.session.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.session.log().len() != before {
            self.follow_tail = true;
        }
    }

    pub fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        self.cursor = 0;

        if text.trim() == RESET_COMMAND {
            info!("Conversation reset requested");
            self.session.reset();
            self.chat_scroll = 0;
            return;
        }

        if let SubmitOutcome::Sent(id) = self.session.submit(&text) {
            info!(request_id = id, "Message submitted");
        }
        self.follow_tail = true;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        if self.chat_scroll == max {
            self.follow_tail = true;
        }
    }

    /// Keep the newest message in view unless the user scrolled away.
    pub fn update_scroll(&mut self) {
        if self.follow_tail {
            self.chat_scroll = self.max_scroll();
        }
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.total_chat_lines().saturating_sub(visible_height)
    }

    /// Number of wrapped lines the chat log occupies at the current width
    pub fn total_chat_lines(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for line in self.session.log().lines() {
            let prefix = line.author.label().chars().count() + 2;
            for (i, text_line) in line.text.lines().enumerate() {
                // Use character count, not byte length, for proper UTF-8 handling
                let mut char_count = text_line.chars().count();
                if i == 0 {
                    char_count += prefix;
                }
                total_lines = total_lines.saturating_add((char_count / wrap_width + 1) as u16);
            }
            if line.text.is_empty() {
                total_lines = total_lines.saturating_add(1);
            }
        }

        if self.session.is_busy() {
            total_lines = total_lines.saturating_add(1); // "Thinking..." line
        }

        total_lines
    }
}
