/// Generate a template `.redit.toml` for `redit --init`.
pub fn generate_init_template() -> String {
	r##"# redit rule file
#
# Rules run top to bottom; each rule sees the output of the previous one.
# Run `redit --dry-run` to see what would change before writing anything.

# Documents rewritten when no files are given on the command line.
files = []

# Mapping tables: ordered key -> token associations.
# Larger tables can live in their own file under [table-files].
[tables.fields]
"fullProperty.address.fullAddress" = "1_full_address"
"fullProperty.address.listingPrice" = "7_listing_price"

# [table-files]
# charts = "tables/charts.toml"

# Append the mapped API key to every renderDataField call.
# Calls whose path has no mapping are left alone and reported as misses.
[[rules]]
name = "add-field-key"
pattern = 'renderDataField\("([^"]+)", (fullProperty\.[a-zA-Z.]+)(?:, ([^)]+))?\)'
table = "fields"
key = "2"
replace = 'renderDataField("$1", $2, $3, undefined, "$value")'
defaults = { 3 = '"text"' }
skip_if_contains = '"$value"'

# Insert an import once.
[[rules]]
name = "motion-import"
find = "import { useEffect } from 'react';"
replace = """import { useEffect } from 'react';
import { motion } from 'framer-motion';"""
count = "first"
skip_if_followed_by = "\nimport { motion }"

# Rewrite inside a balanced block only.
# [[rules]]
# name = "chart-6-1"
# block_start = 'function Chart6_1_\w+\([^)]*\)\s*'
# skip_if_contains = "<motion.div"
#
# [[rules.inner]]
# name = "chart-6-1-legend"
# pattern = '<Legend[^>]*/>'
# replace = '<SmartScaleLegend description="Flooring" />'
"##
	.to_string()
}
