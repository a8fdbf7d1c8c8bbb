//! Lifecycle logging macros
//!
//! Every store operation logs a `start` event at debug level and closes it
//! with either `end` (info) or `end_error` (warn). The component field is
//! the module path of the call site.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_lifecycle {
    ($level:ident, $event:expr, $op:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event
            $(, $($field)*)?
        )
    };
}

/// Open the bracket of an operation
///
/// ```
/// # use mvdb_core::log_op_start;
/// log_op_start!("create_object");
/// log_op_start!("create_object", entity_id = "3f0e");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_lifecycle!(debug, $crate::schema::EVENT_START, $op $(, $($field)*)?)
    };
}

/// Close the bracket of a successful operation
///
/// ```
/// # use mvdb_core::log_op_end;
/// log_op_end!("create_object", duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_lifecycle!(
            info,
            $crate::schema::EVENT_END,
            $op,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Close the bracket of a failed operation
///
/// `$err` is anything convertible into `ExError`; its kind and code are
/// recorded.
///
/// ```
/// # use mvdb_core::{log_op_error, ModelError};
/// log_op_error!("get_object_type", ModelError::NotConnected, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let failure: $crate::errors::ExError = $err.into();
        $crate::__log_lifecycle!(
            warn,
            $crate::schema::EVENT_END_ERROR,
            $op,
            duration_ms = $duration,
            err_kind = ?failure.kind(),
            err_code = failure.code()
            $(, $($field)*)?
        )
    }};
}
