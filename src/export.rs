use crate::error::CrawlError;
use crate::results::{ItemReference, ProductRecord};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const REFERENCES_HEADER: &str = "product_link";

const RECORD_COLUMNS: [&str; 7] = [
    "UPC",
    "Category",
    "Title",
    "Location",
    "Price",
    "Image URL",
    "Product Link",
];

/// Writes the discovered references as a one-column CSV
pub fn write_references(
    path: impl AsRef<Path>,
    references: &[ItemReference],
) -> Result<(), CrawlError> {
    let path = path.as_ref();
    match write_references_inner(path, references) {
        Ok(()) => {
            ::log::info!(
                "Saved {} product links to {}",
                references.len(),
                path.display()
            );
            Ok(())
        }
        Err(source) => Err(CrawlError::Export {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Writes the extracted product records as CSV
pub fn write_records(path: impl AsRef<Path>, records: &[ProductRecord]) -> Result<(), CrawlError> {
    let path = path.as_ref();
    match write_records_inner(path, records) {
        Ok(()) => {
            ::log::info!(
                "Saved {} product records to {}",
                records.len(),
                path.display()
            );
            Ok(())
        }
        Err(source) => Err(CrawlError::Export {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn write_references_inner(path: &Path, references: &[ItemReference]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_row(&mut out, &[REFERENCES_HEADER])?;
    for reference in references {
        write_row(&mut out, &[reference.as_str()])?;
    }
    out.flush()
}

fn write_records_inner(path: &Path, records: &[ProductRecord]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_row(&mut out, &RECORD_COLUMNS)?;
    for record in records {
        write_row(
            &mut out,
            &[
                record.upc.as_str(),
                record.category.as_str(),
                record.title.as_str(),
                record.location.as_str(),
                record.price.as_str(),
                record.image_url.as_str(),
                record.reference.as_str(),
            ],
        )?;
    }
    out.flush()
}

fn write_row<W: Write>(out: &mut W, fields: &[&str]) -> io::Result<()> {
    let mut first = true;
    for field in fields {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        if needs_quotes(field) {
            write!(out, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            out.write_all(field.as_bytes())?;
        }
    }
    out.write_all(b"\n")
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}
