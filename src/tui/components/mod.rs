//! # TUI Components
//!
//! ## Component Architecture
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! Display components that receive all data as props:
//! - `TitleBar`: conversation title, model, flags, status, jump hint
//! - `Message`: a single turn
//! - `ProgressPanel`: backend stages while a reply streams
//!
//! ### Stateful Components (Event-Driven)
//!
//! Components that keep presentation state and emit events:
//! - `InputBox`: prompt editor
//! - `MessageList`: scrollable transcript with layout caching; executes the
//!   controller's scroll commands and reports geometry back
//! - `ConversationPicker`: conversation switcher overlay
//!
//! Stateful components follow the persistent state + transient wrapper
//! pattern: the state struct lives in `TuiState`, and a borrowing wrapper is
//! built each frame to render it.
//!
//! ## Module Structure
//!
//! ```text
//! components/
//! ├── mod.rs                  (this file)
//! ├── title_bar.rs            (Top status bar)
//! ├── message.rs              (Single turn renderer)
//! ├── message_list.rs         (Scrollable transcript)
//! ├── progress_panel.rs       (Progress overlay)
//! ├── input_box.rs            (Prompt editor)
//! └── conversation_picker.rs  (Ctrl+O overlay)
//! ```

pub mod conversation_picker;
pub mod input_box;
pub mod message;
pub mod message_list;
pub mod progress_panel;
pub mod title_bar;

pub use conversation_picker::{ConversationPicker, ConversationPickerState, PickerEvent, PickerInput};
pub use input_box::{InputBox, InputEvent};
pub use message_list::{MessageList, MessageListState};
pub use progress_panel::ProgressPanel;
pub use title_bar::TitleBar;
