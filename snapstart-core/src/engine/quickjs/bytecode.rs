// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Raw QuickJS bytecode compile / write / read / run, plus value
//! serialization for captured globals.
//!
//! The safe rquickjs API evaluates source directly; these helpers split
//! evaluation into compile and run so the compiled form can be journaled.
//! Every function returns `Err(Error::Exception)` with the exception left
//! pending on the context, ready for `CatchResultExt::catch`.

use std::ffi::{CStr, CString};

use rquickjs::{qjs, Ctx, Error, Result, Value};

/// Compile a global script without running it and write its bytecode.
pub fn compile(ctx: &Ctx<'_>, name: &str, code: &str, strip: bool) -> Result<Vec<u8>> {
    let file_name = CString::new(name)?;
    let source = CString::new(code)?;
    let flags = (qjs::JS_EVAL_TYPE_GLOBAL | qjs::JS_EVAL_FLAG_COMPILE_ONLY) as i32;

    // SAFETY: both strings are NUL-terminated and outlive the call; the
    // returned value is owned by us and freed below.
    unsafe {
        let func = qjs::JS_Eval(
            ctx.as_raw().as_ptr(),
            source.as_ptr(),
            code.len() as _,
            file_name.as_ptr(),
            flags,
        );
        if qjs::JS_IsException(func) {
            return Err(Error::Exception);
        }
        let written = write_object(ctx, func, strip);
        qjs::JS_FreeValue(ctx.as_raw().as_ptr(), func);
        written
    }
}

/// Re-encode previously written bytecode, optionally stripping source text
/// and debug info.
pub fn rewrite(ctx: &Ctx<'_>, bytecode: &[u8], strip: bool) -> Result<Vec<u8>> {
    // SAFETY: `read_object` hands back an owned value that is freed here.
    unsafe {
        let func = read_object(ctx, bytecode)?;
        let written = write_object(ctx, func, strip);
        qjs::JS_FreeValue(ctx.as_raw().as_ptr(), func);
        written
    }
}

/// Load bytecode and run it as a global script. Returns the completion value.
pub fn run<'js>(ctx: &Ctx<'js>, bytecode: &[u8]) -> Result<Value<'js>> {
    // SAFETY: JS_EvalFunction takes ownership of `func`. The result is an
    // owned value handed to `Value::from_raw`.
    unsafe {
        let func = read_object(ctx, bytecode)?;
        let result = qjs::JS_EvalFunction(ctx.as_raw().as_ptr(), func);
        if qjs::JS_IsException(result) {
            return Err(Error::Exception);
        }
        Ok(Value::from_raw(ctx.clone(), result))
    }
}

/// Serialize a plain value (primitives, arrays, objects, maps, sets, dates,
/// typed arrays). Shared and cyclic references inside the value survive.
/// Functions and host objects raise a pending exception.
pub fn write_value(ctx: &Ctx<'_>, value: &Value<'_>) -> Result<Vec<u8>> {
    // SAFETY: `as_raw` borrows the value for the duration of the call.
    unsafe { write_raw(ctx, value.as_raw(), qjs::JS_WRITE_OBJ_REFERENCE) }
}

/// Read back a value written by [`write_value`].
pub fn read_value<'js>(ctx: &Ctx<'js>, bytes: &[u8]) -> Result<Value<'js>> {
    // SAFETY: the returned value is owned and handed to `Value::from_raw`.
    unsafe {
        let value = read_raw(ctx, bytes, qjs::JS_READ_OBJ_REFERENCE)?;
        Ok(Value::from_raw(ctx.clone(), value))
    }
}

/// Version string of the linked QuickJS library.
pub fn engine_version() -> String {
    // SAFETY: JS_GetVersion returns a static NUL-terminated string.
    unsafe {
        let ptr = qjs::JS_GetVersion();
        if ptr.is_null() {
            return "unknown".to_string();
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

unsafe fn read_object(ctx: &Ctx<'_>, bytecode: &[u8]) -> Result<qjs::JSValue> {
    read_raw(ctx, bytecode, qjs::JS_READ_OBJ_BYTECODE)
}

unsafe fn write_object(ctx: &Ctx<'_>, value: qjs::JSValue, strip: bool) -> Result<Vec<u8>> {
    let mut flags = qjs::JS_WRITE_OBJ_BYTECODE;
    if strip {
        flags |= qjs::JS_WRITE_OBJ_STRIP_SOURCE | qjs::JS_WRITE_OBJ_STRIP_DEBUG;
    }
    write_raw(ctx, value, flags)
}

unsafe fn read_raw(ctx: &Ctx<'_>, bytes: &[u8], flags: u32) -> Result<qjs::JSValue> {
    let value = qjs::JS_ReadObject(
        ctx.as_raw().as_ptr(),
        bytes.as_ptr(),
        bytes.len() as _,
        flags as i32,
    );
    if qjs::JS_IsException(value) {
        return Err(Error::Exception);
    }
    Ok(value)
}

unsafe fn write_raw(ctx: &Ctx<'_>, value: qjs::JSValue, flags: u32) -> Result<Vec<u8>> {
    let mut len: qjs::size_t = 0;
    let ptr = qjs::JS_WriteObject(ctx.as_raw().as_ptr(), &mut len, value, flags as i32);
    if ptr.is_null() {
        return Err(Error::Exception);
    }

    let bytes = std::slice::from_raw_parts(ptr, len as usize).to_vec();
    qjs::js_free(ctx.as_raw().as_ptr(), ptr.cast());
    Ok(bytes)
}
