//! Output collaborator: where finished products go.
//!
//! Persisting products (file naming, directory layout, binary formats) is
//! the job of a [`ProductSink`] implementation outside this crate.
//! [`MemorySink`] keeps them in memory in emission order.

use log::info;
use thiserror::Error;

use crate::products::{OutputProduct, ProductKind};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Rejected product {camera} ({kind}): {reason}")]
    Rejected {
        kind: &'static str,
        camera: String,
        reason: String,
    },
}

pub trait ProductSink {
    fn write(&mut self, product: OutputProduct) -> Result<(), SinkError>;
}

#[derive(Debug, Default)]
pub struct MemorySink {
    products: Vec<OutputProduct>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn products(&self) -> &[OutputProduct] {
        &self.products
    }

    pub fn of_kind(&self, kind: ProductKind) -> impl Iterator<Item = &OutputProduct> {
        self.products.iter().filter(move |p| p.kind() == kind)
    }

    pub fn into_products(self) -> Vec<OutputProduct> {
        self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductSink for MemorySink {
    fn write(&mut self, product: OutputProduct) -> Result<(), SinkError> {
        info!(
            "Wrote {} for camera {}",
            product.kind().file_type(),
            product.header().camera
        );
        self.products.push(product);
        Ok(())
    }
}
