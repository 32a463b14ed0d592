/// Declares a `static` [`TransactionContext`](crate::isr::TransactionContext) shared by
/// an [`InterruptDecoder`](crate::isr::InterruptDecoder) and the edge interrupt handler.
///
/// # Arguments
/// - `$name`: name of the static
///
/// # Example
/// ```rust,ignore
/// n64pad::transaction_context!(PAD_CTX);
///
/// #[interrupt]
/// fn INT0() {
///     PAD_CTX.on_falling_edge(data_pin_is_high());
/// }
/// ```
#[macro_export]
macro_rules! transaction_context {
    ( $name:ident ) => {
        /// Edge handler state for the controller bus.
        pub static $name: $crate::isr::TransactionContext = $crate::isr::TransactionContext::new();
    };
}

/// Declares a `static` [`TimeoutFlag`](crate::isr::TimeoutFlag) raised by a countdown
/// timer's interrupt handler.
///
/// # Arguments
/// - `$name`: name of the static
///
/// # Example
/// ```rust,ignore
/// n64pad::timeout_flag!(PAD_TIMEOUT);
///
/// #[interrupt]
/// fn TIMER1_COMPA() {
///     PAD_TIMEOUT.expire(&mut Timer1::steal());
/// }
/// ```
///
/// # Notes
/// - The same flag must be passed to
///   [`CountdownTimeout::new`](crate::isr::CountdownTimeout::new).
#[macro_export]
macro_rules! timeout_flag {
    ( $name:ident ) => {
        /// Raised when the controller bus transaction runs out of time.
        pub static $name: $crate::isr::TimeoutFlag = $crate::isr::TimeoutFlag::new();
    };
}
