use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use filetime::FileTime;

const BUFFER_SIZE: usize = 64 * 1024;

/// Copy `src` to a new file at `dst`, carrying over permissions and
/// access/modification times. Returns the number of bytes written.
///
/// `dst` must not exist; an existing file is never overwritten. If the copy
/// fails after `dst` was created, the partial file is removed.
pub fn copy_file_with_metadata(src: &Path, dst: &Path) -> io::Result<u64> {
    let src_meta = fs::metadata(src)?;
    if !src_meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a regular file: {}", src.display()),
        ));
    }
    let mut src_file = File::open(src)?;
    let mut dst_file = OpenOptions::new().write(true).create_new(true).open(dst)?;

    let copied = copy_content(&mut src_file, &mut dst_file).and_then(|bytes| {
        drop(dst_file);
        filetime::set_file_times(
            dst,
            FileTime::from_last_access_time(&src_meta),
            FileTime::from_last_modification_time(&src_meta),
        )?;
        // permissions last, a read-only mode would block the time update
        fs::set_permissions(dst, src_meta.permissions())?;
        Ok(bytes)
    });
    if copied.is_err() {
        let _ = fs::remove_file(dst);
    }
    copied
}

fn copy_content(src_file: &mut File, dst_file: &mut File) -> io::Result<u64> {
    let mut buffer = vec![0; BUFFER_SIZE];
    let mut bytes_copied: u64 = 0;
    loop {
        let bytes_read = match src_file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        dst_file.write_all(&buffer[..bytes_read])?;
        bytes_copied += bytes_read as u64;
    }
    dst_file.flush()?;
    Ok(bytes_copied)
}
