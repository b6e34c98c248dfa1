mod command_input;
mod confirm_dialog;
mod input;
mod key_result;
mod rename_dialog;
mod search_input;
mod stack_form;
mod toast;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm_dialog::{ConfirmDialog, ConfirmEvent};
pub use key_result::KeyResult;
pub use rename_dialog::{RenameDialog, RenameEvent};
pub use search_input::SearchInput;
pub use stack_form::{StackForm, StackFormEvent};
pub use toast::ToastStack;
