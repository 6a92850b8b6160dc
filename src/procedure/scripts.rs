//! Lua bodies of the server-side procedures.
//!
//! Redis runs each script to completion before serving any other command,
//! so every read-modify-write below is indivisible per key.

/// Fixed-window increment with a forced-reset mode.
///
/// KEYS[1] is the subject key. ARGV is
/// `[points, window_secs, force_expire, configured_limit, configured_window_secs]`.
/// The last two are not read here; replacement bodies may use them.
/// `points` reaches `SET` and `INCRBY` as the caller's string, since Lua
/// would print large numbers in exponent form. Returns `{consumed, pttl}`.
pub const INCREMENT: &str = r#"
local key = KEYS[1]
local points = ARGV[1]
local secs = tonumber(ARGV[2])

if ARGV[3] == 'true' then
  if secs > 0 then
    redis.call('SET', key, points, 'EX', secs)
  else
    redis.call('SET', key, points)
  end
  return {redis.call('GET', key), redis.call('PTTL', key)}
end

if secs > 0 then
  redis.call('SET', key, 0, 'EX', secs, 'NX')
else
  redis.call('SET', key, 0, 'NX')
end
local consumed = redis.call('INCRBY', key, points)
return {consumed, redis.call('PTTL', key)}
"#;

/// Read the counter and its remaining time-to-live without touching it.
///
/// Returns `{consumed, pttl}`, or nil when the key is absent (`PTTL` -2) or
/// has no expiry (`PTTL` -1).
pub const PEEK: &str = r#"
local key = KEYS[1]
local ttl = redis.call('PTTL', key)

if ttl == -2 then
  return nil
end
if ttl == -1 then
  return nil
end

return {tonumber(redis.call('GET', key)), ttl}
"#;
