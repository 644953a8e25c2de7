/// Lua script for acquiring a lease (SET NX PX).
///
/// KEYS\[1\] = lease key
/// ARGV\[1\] = leader token
/// ARGV\[2\] = TTL in milliseconds
///
/// Returns 1 if acquired, 0 if the key is already held.
pub const LEASE_ACQUIRE: &str = r"
local ok = redis.call('SET', KEYS[1], ARGV[1], 'NX', 'PX', ARGV[2])
if ok then
    return 1
end
return 0
";

/// Lua script for extending a lease's TTL.
///
/// KEYS\[1\] = lease key
/// ARGV\[1\] = leader token
/// ARGV\[2\] = new TTL in milliseconds
///
/// Returns 1 if extended, 0 if the key is missing or held by another token.
pub const LEASE_EXTEND: &str = r"
local holder = redis.call('GET', KEYS[1])
if holder == ARGV[1] then
    redis.call('PEXPIRE', KEYS[1], ARGV[2])
    return 1
end
return 0
";

/// Lua script for releasing a lease.
///
/// KEYS\[1\] = lease key
/// ARGV\[1\] = leader token
///
/// Returns 1 if deleted, 0 if the key is missing or held by another token.
pub const LEASE_RELEASE: &str = r"
local holder = redis.call('GET', KEYS[1])
if holder == ARGV[1] then
    redis.call('DEL', KEYS[1])
    return 1
end
return 0
";
