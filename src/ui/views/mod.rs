mod stack_detail;
mod stack_list;

pub use stack_detail::StackDetailView;
pub use stack_list::StackListView;
