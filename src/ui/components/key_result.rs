/// Outcome of offering a key to a component.
///
/// Components return this to their parent view so key handlers can be
/// chained: `NotHandled` passes the key on, `Event` carries something the
/// view has to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, nothing for the parent to do
  Handled,
  /// Key was consumed and produced an event for the parent
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
